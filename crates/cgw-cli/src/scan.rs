//! # Scan Subcommand
//!
//! Runs the whole wizard in-process: fill the form, run the scan to
//! completion, print the results and, with `--approve-as`, record the
//! approval.
//!
//! Exit code 1 means approval was requested and refused.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use cgw_core::{
    DeploymentConfig, DeploymentConfigPatch, DeploymentType, GatewayConfig, Region, RiskTier,
    ScanMode,
};
use cgw_governance::ApprovalLedger;
use cgw_scan::Scanner;
use cgw_state::{ApprovalReceipt, CheckResult, CheckStatus, ScanSummary, Session, Stage};

/// Arguments for `cgw scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project name, with or without the `api/` prefix.
    #[arg(long)]
    pub project: String,

    #[arg(long, default_value_t = Region::Eu)]
    pub region: Region,

    #[arg(long, default_value_t = DeploymentType::Production)]
    pub deployment_type: DeploymentType,

    #[arg(long, default_value_t = RiskTier::Medium)]
    pub risk_tier: RiskTier,

    /// Approve the deployment under this name once the scan passes.
    #[arg(long, value_name = "NAME")]
    pub approve_as: Option<String>,

    /// Seed for reproducible outcomes, durations and approval id.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Gateway configuration file. `CGW_*` overrides apply on top.
    #[arg(long, env = "CGW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip simulated check delays.
    #[arg(long)]
    pub instant: bool,

    /// Print a JSON report instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable result of `cgw scan --json`.
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub session_id: String,
    pub project: String,
    pub region: Region,
    pub deployment_type: DeploymentType,
    pub risk_tier: RiskTier,
    pub mode: ScanMode,
    pub stage: Stage,
    pub summary: ScanSummary,
    pub results: Vec<CheckResult>,
    pub approval: Option<ApprovalReceipt>,
    /// Why approval was refused, when it was requested.
    pub refusal: Option<String>,
}

pub fn run_scan(args: &ScanArgs, out: &mut impl Write) -> Result<u8> {
    let mut gateway = match &args.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading gateway config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    gateway
        .apply_process_env()
        .context("applying CGW_* overrides")?;
    if args.instant {
        gateway.scan.min_delay_ms = 0;
        gateway.scan.max_delay_ms = 0;
    }

    let mut session = Session::new(DeploymentConfig::default());
    session
        .update_config(DeploymentConfigPatch {
            project_name: Some(args.project.clone()),
            approver_name: args.approve_as.clone(),
            deployment_type: Some(args.deployment_type),
            risk_tier: Some(args.risk_tier),
            region: Some(args.region),
        })
        .context("invalid deployment form")?;

    let mut scanner = Scanner::simulated(&gateway.scan, args.seed);
    let mode = scanner.mode();
    tracing::info!(session_id = %session.id(), region = %args.region, %mode, "starting scan");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building tokio runtime")?;
    let summary = runtime
        .block_on(cgw_scan::drive(&mut session, &mut scanner))
        .context("scan failed")?;

    let (approval, refusal) = match args.approve_as {
        Some(_) => match approve(&mut session, args.seed) {
            Ok(receipt) => (Some(receipt), None),
            Err(e) => (None, Some(format!("{e:#}"))),
        },
        None => (None, None),
    };
    let exit = if refusal.is_some() { 1 } else { 0 };

    let output = ScanOutput {
        session_id: session.id().to_string(),
        project: session
            .config()
            .project_name
            .as_ref()
            .map(|p| p.display_path())
            .unwrap_or_default(),
        region: args.region,
        deployment_type: args.deployment_type,
        risk_tier: args.risk_tier,
        mode,
        stage: session.stage(),
        summary,
        results: session.results().to_vec(),
        approval,
        refusal,
    };

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        print_report(&output, out)?;
    }
    Ok(exit)
}

fn approve(session: &mut Session, seed: Option<u64>) -> Result<ApprovalReceipt> {
    session.check_approvable()?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let ledger = ApprovalLedger::new();
    let approval_id = ledger.issue_id(&mut rng)?;
    let receipt = session.approve(approval_id)?;
    tracing::info!(approval_id = %receipt.approval_id, approver = %receipt.approver, "deployment approved");
    Ok(receipt)
}

fn print_report(output: &ScanOutput, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Project:  {}", output.project)?;
    writeln!(
        out,
        "Target:   {} / {} risk / {}",
        output.deployment_type,
        output.risk_tier,
        output.region.display_name()
    )?;
    writeln!(out, "Scan:     {} checks, {}", output.results.len(), output.mode)?;
    writeln!(out)?;

    for result in &output.results {
        let status = match result.status {
            CheckStatus::Passed => "PASS",
            CheckStatus::Failed => "FAIL",
            CheckStatus::Running => "RUN",
            CheckStatus::Pending => "-",
        };
        let duration = result
            .duration_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_default();
        writeln!(
            out,
            "  {:<4} {:>7}  {:<30} {}",
            status,
            duration,
            result.check.id.as_str(),
            result.check.name
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Summary:  {} passed, {} failed of {}",
        output.summary.passed, output.summary.failed, output.summary.total
    )?;
    writeln!(out, "Stage:    {}", output.stage)?;
    if let Some(receipt) = &output.approval {
        writeln!(out, "Approved: {} by {}", receipt.approval_id, receipt.approver)?;
    }
    if let Some(reason) = &output.refusal {
        writeln!(out, "Refused:  {reason}")?;
    }
    Ok(())
}
