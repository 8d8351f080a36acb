//! # Check Executors

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cgw_core::{CheckDefinition, ScanSettings};
use cgw_state::CheckOutcome;

/// Result of executing one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckRun {
    pub outcome: CheckOutcome,
    /// How long the check takes. The scanner sleeps for this long.
    pub duration: Duration,
}

impl CheckRun {
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Decides the outcome of a check.
pub trait CheckExecutor: Send {
    fn execute(&mut self, check: &CheckDefinition) -> CheckRun;
}

/// Random outcomes and durations drawn from [`ScanSettings`].
#[derive(Debug)]
pub struct SimulatedExecutor {
    rng: StdRng,
    min_delay_ms: u64,
    max_delay_ms: u64,
    pass_probability: f64,
}

impl SimulatedExecutor {
    /// Seeded from entropy.
    pub fn new(settings: &ScanSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Reproducible: the same seed yields the same outcomes and durations.
    pub fn seeded(settings: &ScanSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &ScanSettings, rng: StdRng) -> Self {
        let min_delay_ms = settings.min_delay_ms.min(settings.max_delay_ms);
        Self {
            rng,
            min_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            pass_probability: sanitize_probability(settings.pass_probability),
        }
    }
}

// gen_bool panics outside [0, 1].
fn sanitize_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

impl CheckExecutor for SimulatedExecutor {
    fn execute(&mut self, _check: &CheckDefinition) -> CheckRun {
        let ms = self.rng.gen_range(self.min_delay_ms..=self.max_delay_ms);
        let outcome = if self.rng.gen_bool(self.pass_probability) {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Failed
        };
        CheckRun {
            outcome,
            duration: Duration::from_millis(ms),
        }
    }
}
