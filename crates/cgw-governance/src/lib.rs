//! # cgw-governance: Governance Records
//!
//! The records that outlive a single session:
//!
//! - [`ApprovalLedger`]: every approval granted, newest first.
//! - [`FeedbackLog`]: append-only operator feedback.
//! - [`ReviewSchedule`]: when the next governance review is due.
//! - [`AuditTrail`]: hash-chained log of every gateway mutation.
//!
//! Everything is held in memory. Callers share these behind locks.

pub mod approval;
pub mod audit;
pub mod error;
pub mod feedback;
pub mod schedule;

pub use approval::{ApprovalLedger, ApprovalRecord, ApprovalStatus};
pub use audit::{AuditEntry, AuditEventKind, AuditTrail};
pub use error::{AuditError, GovernanceError};
pub use feedback::{FeedbackCategory, FeedbackEntry, FeedbackLog, MAX_FEEDBACK_CHARS};
pub use schedule::ReviewSchedule;
