//! # Gateway Configuration
//!
//! YAML configuration shared by the API server and the CLI. Every field is
//! optional; an empty document yields the defaults below.
//!
//! ```yaml
//! scan:
//!   mode: sequential
//!   min_delay_ms: 400
//!   max_delay_ms: 1200
//!   pass_probability: 0.95
//! governance:
//!   review_cadence_days: 90
//!   last_review: 2026-07-01
//! audit_capacity: 10000
//! session_capacity: 1000
//! ```
//!
//! The binaries layer `CGW_*` environment variables on top via
//! [`GatewayConfig::apply_env`].

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on a single simulated check duration.
pub const MAX_CHECK_DELAY_MS: u64 = 60_000;

/// How the checks of a plan are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// One check at a time in plan order.
    #[default]
    Sequential,
    /// Every check starts at once and settles when its delay elapses.
    Concurrent,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("unknown scan mode {other:?}")),
        }
    }
}

/// Parameters of the simulated scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub mode: ScanMode,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Probability that a single check passes.
    pub pass_probability: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: ScanMode::Sequential,
            min_delay_ms: 400,
            max_delay_ms: 1200,
            pass_probability: 0.95,
        }
    }
}

impl ScanSettings {
    /// Settings with no artificial delay.
    pub fn instant(pass_probability: f64) -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            pass_probability,
            ..Self::default()
        }
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid {
                field: "scan.min_delay_ms",
                reason: format!(
                    "{} exceeds max_delay_ms {}",
                    self.min_delay_ms, self.max_delay_ms
                ),
            });
        }
        if self.max_delay_ms > MAX_CHECK_DELAY_MS {
            return Err(ConfigError::Invalid {
                field: "scan.max_delay_ms",
                reason: format!("must not exceed {MAX_CHECK_DELAY_MS}"),
            });
        }
        if !(0.0..=1.0).contains(&self.pass_probability) {
            return Err(ConfigError::Invalid {
                field: "scan.pass_probability",
                reason: format!("{} is outside [0, 1]", self.pass_probability),
            });
        }
        Ok(())
    }
}

/// Governance review schedule settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceSettings {
    pub review_cadence_days: u32,
    /// Date of the most recent governance review. Defaults to the start date
    /// of the process when absent.
    pub last_review: Option<NaiveDate>,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            review_cadence_days: 90,
            last_review: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub scan: ScanSettings,
    pub governance: GovernanceSettings,
    /// Maximum number of audit entries kept in memory.
    pub audit_capacity: usize,
    /// Maximum number of sessions kept in memory. At capacity the least
    /// recently updated session is dropped, preferring ones not scanning.
    pub session_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scan: ScanSettings::default(),
            governance: GovernanceSettings::default(),
            audit_capacity: 10_000,
            session_capacity: 1_000,
        }
    }
}

impl GatewayConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = if s.trim().is_empty() {
            GatewayConfig::default()
        } else {
            serde_yaml::from_str(s)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        if self.governance.review_cadence_days == 0 {
            return Err(ConfigError::Invalid {
                field: "governance.review_cadence_days",
                reason: "must be at least 1".into(),
            });
        }
        if self.audit_capacity < 10 {
            return Err(ConfigError::Invalid {
                field: "audit_capacity",
                reason: "must be at least 10".into(),
            });
        }
        if self.session_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "session_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Apply `CGW_SCAN_MODE`, `CGW_PASS_PROBABILITY`, `CGW_MIN_DELAY_MS` and
    /// `CGW_MAX_DELAY_MS` from `lookup`, then re-validate.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var, value })
        }

        if let Some(v) = lookup("CGW_SCAN_MODE") {
            self.scan.mode = parse("CGW_SCAN_MODE", v)?;
        }
        if let Some(v) = lookup("CGW_PASS_PROBABILITY") {
            self.scan.pass_probability = parse("CGW_PASS_PROBABILITY", v)?;
        }
        if let Some(v) = lookup("CGW_MIN_DELAY_MS") {
            self.scan.min_delay_ms = parse("CGW_MIN_DELAY_MS", v)?;
        }
        if let Some(v) = lookup("CGW_MAX_DELAY_MS") {
            self.scan.max_delay_ms = parse("CGW_MAX_DELAY_MS", v)?;
        }
        self.validate()
    }

    /// [`apply_env`](Self::apply_env) against the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|var| std::env::var(var).ok())
    }
}
