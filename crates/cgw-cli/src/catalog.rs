//! # Catalog Subcommands
//!
//! `cgw regions` and `cgw checks`.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use cgw_core::{CheckCatalog, CheckCategory, Region};

/// Arguments for `cgw regions`.
#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `cgw checks`.
#[derive(Args, Debug)]
pub struct ChecksArgs {
    /// Region whose plan to print (`eu`, `uk`, `us`, `apac`).
    #[arg(long)]
    pub region: Region,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run_regions(args: &RegionsArgs, out: &mut impl Write) -> Result<u8> {
    if args.json {
        let regions: Vec<_> = Region::ALL
            .iter()
            .map(|r| json!({ "id": r.id(), "name": r.display_name() }))
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&regions)?)?;
        return Ok(0);
    }
    for region in Region::ALL {
        writeln!(out, "{:<6} {}", region.id(), region.display_name())?;
    }
    Ok(0)
}

pub fn run_checks(args: &ChecksArgs, out: &mut impl Write) -> Result<u8> {
    let plan = CheckCatalog::plan_for(args.region);
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&plan)?)?;
        return Ok(0);
    }

    writeln!(
        out,
        "{} checks for {} ({}):",
        plan.len(),
        args.region.display_name(),
        args.region.id()
    )?;
    for (i, check) in plan.iter().enumerate() {
        let scope = match check.category {
            CheckCategory::Technical => "technical",
            CheckCategory::Regional(_) => "regional",
        };
        writeln!(out, "{:>3}. [{:<9}] {:<30} {}", i + 1, scope, check.id.as_str(), check.name)?;
    }
    Ok(0)
}
