//! # cgw-scan: Simulated Compliance Scan
//!
//! Runs the check plan of a [`ScanTicket`](cgw_state::ScanTicket) and reports
//! progress as a stream of [`ScanEvent`]s over a `tokio::sync::mpsc` channel.
//! The scanner never touches a session directly; [`apply_event`] folds one
//! event into a session and [`drive`] wires the two together for callers
//! that own the session outright.
//!
//! Checks are simulated by a [`CheckExecutor`]. The default
//! [`SimulatedExecutor`] draws a duration and a pass/fail outcome from a
//! seedable RNG, so a fixed seed reproduces a scan exactly.

pub mod driver;
pub mod executor;
pub mod scanner;

pub use cgw_state::CheckOutcome;
pub use driver::{apply_event, drive};
pub use executor::{CheckExecutor, CheckRun, SimulatedExecutor};
pub use scanner::{event_capacity, ScanError, ScanEvent, ScanReport, Scanner};
