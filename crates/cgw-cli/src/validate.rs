//! # Validate Subcommand
//!
//! Parses a gateway configuration file and applies the same range checks
//! the API server applies at startup.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use cgw_core::GatewayConfig;

/// Arguments for `cgw validate-config`.
#[derive(Args, Debug)]
pub struct ValidateConfigArgs {
    /// YAML configuration file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Returns 0 when the file is valid, 1 otherwise.
pub fn run_validate_config(args: &ValidateConfigArgs, out: &mut impl Write) -> Result<u8> {
    match GatewayConfig::load(&args.path) {
        Ok(config) => {
            writeln!(out, "OK: {}", args.path.display())?;
            writeln!(
                out,
                "  scan: {} mode, {}-{}ms per check, pass probability {}",
                config.scan.mode,
                config.scan.min_delay_ms,
                config.scan.max_delay_ms,
                config.scan.pass_probability
            )?;
            let last = config
                .governance
                .last_review
                .map(|d| d.to_string())
                .unwrap_or_else(|| "not set".to_string());
            writeln!(
                out,
                "  governance: review every {} days, last review {}",
                config.governance.review_cadence_days, last
            )?;
            writeln!(out, "  audit capacity: {}", config.audit_capacity)?;
            writeln!(out, "  session capacity: {}", config.session_capacity)?;
            Ok(0)
        }
        Err(e) => {
            tracing::debug!(path = %args.path.display(), error = %e, "config rejected");
            writeln!(out, "FAIL: {}: {e}", args.path.display())?;
            Ok(1)
        }
    }
}
