//! # cgw-cli: Compliance Gateway Command-Line Interface
//!
//! Runs the deployment wizard end to end in a single process, without the
//! HTTP service.
//!
//! ## Subcommands
//!
//! - `regions`: list deployment regions
//! - `checks`: print the ordered check plan for a region
//! - `scan`: configure, scan, review and optionally approve a deployment
//! - `validate-config`: parse and validate a gateway configuration file
//!
//! Every handler writes its report to the supplied writer and returns the
//! process exit code: 0 on success, 1 when the run completed but failed
//! (failed checks blocking approval, an invalid config file).

pub mod catalog;
pub mod scan;
pub mod validate;
