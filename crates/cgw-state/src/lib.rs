//! # cgw-state: Gateway Stage Machine
//!
//! One [`Session`] walks a deployment through four stages:
//!
//! ```text
//! Config ──start──▶ Scanning ──all checks settled──▶ Review ──approve──▶ Approved
//!    ▲                  │                               │                  │
//!    └──────────────────┴───────────── reset ───────────┴──────────────────┘
//! ```
//!
//! - `start` requires a project name.
//! - `approve` requires zero failed checks and an approver name.
//! - `reset` works from any stage, keeps the form and discards results.
//!
//! Scan progress arrives as events tagged with a [`ScanId`](cgw_core::ScanId).
//! Events from any scan other than the session's current one are rejected,
//! so a reset during a scan orphans it cleanly.

pub mod session;
pub mod stage;

pub use session::{
    ApprovalReceipt, CheckOutcome, CheckResult, CheckStatus, ScanSummary, ScanTicket, Session,
};
pub use stage::{Stage, StageError, StageTransition};
