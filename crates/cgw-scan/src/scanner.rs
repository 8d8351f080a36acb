//! # Async Scanner
//!
//! Two scheduling modes:
//!
//! - **Sequential**: one check at a time in plan order. Each check is
//!   announced with `CheckStarted`, runs for its duration, then settles.
//! - **Concurrent**: every check is announced up front and settles when its
//!   own duration elapses, so results arrive in duration order.
//!
//! The scanner stops as soon as the event receiver is dropped. A consumer
//! that discovers its scan is stale only has to drop the receiver.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use cgw_core::{CheckDefinition, CheckId, ScanId, ScanMode, ScanSettings};
use cgw_state::{CheckOutcome, ScanTicket, StageError};

use crate::executor::{CheckExecutor, CheckRun, SimulatedExecutor};

/// Progress reported by a running scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    CheckStarted {
        scan_id: ScanId,
        check_id: CheckId,
    },
    CheckSettled {
        scan_id: ScanId,
        check_id: CheckId,
        outcome: CheckOutcome,
        duration_ms: u64,
    },
    ScanFinished {
        scan_id: ScanId,
        passed: usize,
        failed: usize,
    },
}

impl ScanEvent {
    pub fn scan_id(&self) -> ScanId {
        match self {
            Self::CheckStarted { scan_id, .. }
            | Self::CheckSettled { scan_id, .. }
            | Self::ScanFinished { scan_id, .. } => *scan_id,
        }
    }
}

/// Totals of a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scan_id: ScanId,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Error, Debug)]
pub enum ScanError {
    /// The event receiver went away before the scan finished.
    #[error("scan {0} cancelled: event receiver dropped")]
    Cancelled(ScanId),

    /// A background check task failed to complete.
    #[error("check task failed in scan {scan_id}: {reason}")]
    Task { scan_id: ScanId, reason: String },

    /// The session refused the scan or one of its events.
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Runs check plans.
pub struct Scanner {
    mode: ScanMode,
    executor: Box<dyn CheckExecutor>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl Scanner {
    /// A scanner backed by a [`SimulatedExecutor`]. With `seed`, outcomes
    /// and durations are reproducible.
    pub fn simulated(settings: &ScanSettings, seed: Option<u64>) -> Self {
        let executor = match seed {
            Some(seed) => SimulatedExecutor::seeded(settings, seed),
            None => SimulatedExecutor::new(settings),
        };
        Self::with_executor(settings.mode, Box::new(executor))
    }

    pub fn with_executor(mode: ScanMode, executor: Box<dyn CheckExecutor>) -> Self {
        Self { mode, executor }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Run every check of `ticket`, reporting progress on `events`.
    pub async fn run(
        &mut self,
        ticket: &ScanTicket,
        events: mpsc::Sender<ScanEvent>,
    ) -> Result<ScanReport, ScanError> {
        let scan_id = ticket.scan_id;
        tracing::info!(%scan_id, mode = ?self.mode, checks = ticket.plan.len(), "scan started");

        let (passed, failed) = match self.mode {
            ScanMode::Sequential => self.run_sequential(ticket, &events).await?,
            ScanMode::Concurrent => self.run_concurrent(ticket, &events).await?,
        };

        send(&events, ScanEvent::ScanFinished { scan_id, passed, failed }).await?;
        tracing::info!(%scan_id, passed, failed, "scan finished");
        Ok(ScanReport { scan_id, passed, failed })
    }

    async fn run_sequential(
        &mut self,
        ticket: &ScanTicket,
        events: &mpsc::Sender<ScanEvent>,
    ) -> Result<(usize, usize), ScanError> {
        let scan_id = ticket.scan_id;
        let mut tally = Tally::default();
        for check in &ticket.plan {
            send(events, started(scan_id, check)).await?;
            let run = self.executor.execute(check);
            tokio::time::sleep(run.duration).await;
            tally.count(run.outcome);
            send(events, settled(scan_id, check, &run)).await?;
        }
        Ok((tally.passed, tally.failed))
    }

    async fn run_concurrent(
        &mut self,
        ticket: &ScanTicket,
        events: &mpsc::Sender<ScanEvent>,
    ) -> Result<(usize, usize), ScanError> {
        let scan_id = ticket.scan_id;
        let runs: Vec<(CheckDefinition, CheckRun)> = ticket
            .plan
            .iter()
            .map(|check| (check.clone(), self.executor.execute(check)))
            .collect();

        for (check, _) in &runs {
            send(events, started(scan_id, check)).await?;
        }

        // Dropping the set on an early return aborts the remaining sleeps.
        let mut tasks = JoinSet::new();
        for (check, run) in runs {
            tasks.spawn(async move {
                tokio::time::sleep(run.duration).await;
                (check, run)
            });
        }

        let mut tally = Tally::default();
        while let Some(joined) = tasks.join_next().await {
            let (check, run) = joined.map_err(|e| ScanError::Task {
                scan_id,
                reason: e.to_string(),
            })?;
            tally.count(run.outcome);
            send(events, settled(scan_id, &check, &run)).await?;
        }
        Ok((tally.passed, tally.failed))
    }
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
}

impl Tally {
    fn count(&mut self, outcome: CheckOutcome) {
        match outcome {
            CheckOutcome::Passed => self.passed += 1,
            CheckOutcome::Failed => self.failed += 1,
        }
    }
}

fn started(scan_id: ScanId, check: &CheckDefinition) -> ScanEvent {
    ScanEvent::CheckStarted {
        scan_id,
        check_id: check.id.clone(),
    }
}

fn settled(scan_id: ScanId, check: &CheckDefinition, run: &CheckRun) -> ScanEvent {
    tracing::debug!(
        %scan_id,
        check = %check.id,
        outcome = ?run.outcome,
        duration_ms = run.duration_ms(),
        "check settled"
    );
    ScanEvent::CheckSettled {
        scan_id,
        check_id: check.id.clone(),
        outcome: run.outcome,
        duration_ms: run.duration_ms(),
    }
}

async fn send(events: &mpsc::Sender<ScanEvent>, event: ScanEvent) -> Result<(), ScanError> {
    let scan_id = event.scan_id();
    events.send(event).await.map_err(|_| {
        tracing::info!(%scan_id, "scan cancelled");
        ScanError::Cancelled(scan_id)
    })
}

/// Channel capacity that holds every event of a plan without blocking.
pub fn event_capacity(plan_len: usize) -> usize {
    plan_len * 2 + 1
}
