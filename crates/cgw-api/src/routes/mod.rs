//! # API Route Modules
//!
//! - `sessions`: the deployment wizard: form, scan, review, approval.
//! - `catalog`: regions and the ordered check plan.
//! - `governance`: approvals, feedback, review schedule, audit trail.

pub mod catalog;
pub mod governance;
pub mod sessions;
