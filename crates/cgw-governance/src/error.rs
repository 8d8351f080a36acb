//! # Governance Errors

use chrono::NaiveDate;
use thiserror::Error;

use cgw_core::{ApprovalId, CanonicalizationError, ValidationError};

/// A governance operation was refused.
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// An input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The approval id is already in the ledger.
    #[error("approval {0} is already recorded")]
    DuplicateApproval(ApprovalId),

    /// No unused approval id could be drawn.
    #[error("no unused approval id found after {attempts} attempts")]
    ApprovalIdsExhausted {
        /// Draws made before giving up.
        attempts: usize,
    },

    /// A review completion earlier than the last recorded review.
    #[error("review date {requested} is earlier than the last review on {last}")]
    ReviewOutOfOrder {
        /// Last recorded review.
        last: NaiveDate,
        /// Rejected date.
        requested: NaiveDate,
    },

    /// An audit entry could not be canonicalized.
    #[error("audit entry canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// The audit chain failed verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// An entry's stored digest does not match its content.
    #[error("audit entry {sequence} digest does not match its content")]
    DigestMismatch {
        /// Sequence number of the entry.
        sequence: u64,
    },

    /// An entry does not link to its predecessor.
    #[error("audit entry {sequence} does not link to its predecessor")]
    BrokenLink {
        /// Sequence number of the entry.
        sequence: u64,
    },

    /// An entry could not be re-canonicalized.
    #[error("audit entry {sequence} could not be canonicalized")]
    Unhashable {
        /// Sequence number of the entry.
        sequence: u64,
    },
}
