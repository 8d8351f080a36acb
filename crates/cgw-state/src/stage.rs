//! # Stages and Transition Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cgw_core::{CheckId, ScanId, Timestamp, ValidationError};

/// Where a session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// The form is editable; no scan has started.
    #[default]
    Config,
    /// Checks are running.
    Scanning,
    /// Every check has settled; awaiting approval.
    Review,
    /// Approved with an approval id.
    Approved,
}

impl Stage {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "CONFIG",
            Self::Scanning => "SCANNING",
            Self::Review => "REVIEW",
            Self::Approved => "APPROVED",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one stage change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub at: Timestamp,
    pub reason: String,
}

/// A session operation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The operation is not available in the current stage.
    #[error("cannot {action} while session is in stage {stage}")]
    WrongStage {
        /// What was attempted.
        action: &'static str,
        /// Current stage.
        stage: Stage,
    },

    /// The form cannot be edited once a scan has started.
    #[error("deployment configuration is locked in stage {stage}; reset to edit")]
    ConfigLocked {
        /// Current stage.
        stage: Stage,
    },

    /// A form value was rejected, or the form is not ready to scan.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// An event referenced a scan that is no longer current.
    #[error("scan {got} is not the current scan")]
    StaleScan {
        /// The session's current scan, if any.
        current: Option<ScanId>,
        /// The scan named by the event.
        got: ScanId,
    },

    /// The check is not part of the current plan.
    #[error("check {0} is not part of the current plan")]
    UnknownCheck(CheckId),

    /// The check has already started or settled.
    #[error("check {0} is not pending")]
    NotPending(CheckId),

    /// The check already has a final outcome.
    #[error("check {0} has already settled")]
    AlreadySettled(CheckId),

    /// Approval refused because checks failed.
    #[error("{failed} of {total} checks failed; approval requires zero failures")]
    FailedChecks {
        /// Number of failed checks.
        failed: usize,
        /// Plan size.
        total: usize,
    },

    /// Approval refused because no approver name is set.
    #[error("an approver name is required to approve")]
    MissingApprover,
}
