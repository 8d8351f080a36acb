//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Locking
//!
//! Every lock is `parking_lot` and none is held across an `.await`.
//! When more than one is needed they are taken in this order:
//!
//! ```text
//! ledger → sessions → rng → audit
//! ```
//!
//! Feedback and schedule locks are never held together with another lock
//! except audit, which always comes last.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cgw_core::{GatewayConfig, SessionId};
use cgw_governance::{
    ApprovalLedger, AuditEventKind, AuditTrail, FeedbackLog, ReviewSchedule,
};
use cgw_state::{Session, Stage};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash, T: Clone> Store<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Insert a record, first removing the record `evict` picks when the
    /// store already holds `capacity` records. Returns the removed record.
    pub fn insert_evicting(
        &self,
        id: K,
        value: T,
        capacity: usize,
        evict: impl FnOnce(&HashMap<K, T>) -> Option<K>,
    ) -> Option<T> {
        let mut data = self.data.write();
        let evicted = if data.len() >= capacity && !data.contains_key(&id) {
            evict(&data).and_then(|victim| data.remove(&victim))
        } else {
            None
        };
        data.insert(id, value);
        evicted
    }

    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist, or `Some` with the closure's result.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Scan, governance and audit settings.
    pub gateway: GatewayConfig,
    /// Seed for reproducible scans and approval ids. `None` draws from
    /// entropy.
    pub scan_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            gateway: GatewayConfig::default(),
            scan_seed: None,
        }
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Store<SessionId, Session>,
    pub ledger: Arc<Mutex<ApprovalLedger>>,
    pub feedback: Arc<Mutex<FeedbackLog>>,
    pub schedule: Arc<Mutex<ReviewSchedule>>,
    pub audit: Arc<Mutex<AuditTrail>>,
    /// Source of approval ids and per-scan seeds.
    pub rng: Arc<Mutex<StdRng>>,
    /// Prometheus render handle. `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let today = chrono::Utc::now().date_naive();
        let schedule = ReviewSchedule::from_settings(&config.gateway.governance, today);
        let audit = AuditTrail::new(config.gateway.audit_capacity);
        let rng = match config.scan_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config: Arc::new(config),
            sessions: Store::new(),
            ledger: Arc::new(Mutex::new(ApprovalLedger::new())),
            feedback: Arc::new(Mutex::new(FeedbackLog::new())),
            schedule: Arc::new(Mutex::new(schedule)),
            audit: Arc::new(Mutex::new(audit)),
            rng: Arc::new(Mutex::new(rng)),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Store a new session. At `session_capacity` the least recently
    /// updated session is dropped first, sessions still scanning last.
    /// A dropped session's scan task stops at its next event.
    pub fn insert_session(&self, session: Session) -> Option<Session> {
        let capacity = self.config.gateway.session_capacity;
        let evicted = self
            .sessions
            .insert_evicting(session.id(), session, capacity, |sessions| {
                sessions
                    .values()
                    .min_by_key(|s| (s.stage() == Stage::Scanning, s.updated_at(), s.id()))
                    .map(Session::id)
            });
        if let Some(old) = &evicted {
            tracing::info!(session_id = %old.id(), stage = %old.stage(), capacity, "session evicted");
        }
        evicted
    }

    /// Seed for the next scan, when scans are reproducible.
    pub fn next_scan_seed(&self) -> Option<u64> {
        self.config.scan_seed.map(|_| self.rng.lock().gen())
    }

    /// Append to the audit trail. Failures are logged, never surfaced:
    /// the operation being audited has already happened.
    pub fn record_audit(
        &self,
        kind: AuditEventKind,
        subject: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = self.audit.lock().append(kind, subject, metadata) {
            tracing::warn!(%kind, error = %e, "audit append failed");
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
