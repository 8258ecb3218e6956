//! Check-constraint command - validate a single `olm.constraint` document.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

use olm_resolver::constraints;

use crate::EXIT_INVALID;

#[derive(Args, Debug)]
pub struct CheckConstraintArgs {
    /// Constraint document, or "-" for stdin
    #[arg(value_name = "FILE|-")]
    pub file: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

fn read_input(file: &Path) -> Result<Vec<u8>> {
    if file.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))
}

/// Returns the exit code and the report for a document
pub fn check(raw: &[u8], as_json: bool) -> (i32, String) {
    match constraints::parse(raw) {
        Ok(constraint) if as_json => {
            let report = json!({
                "valid": true,
                "message": constraint.message(),
                "constraint": constraint.describe(),
            });
            (0, report.to_string())
        }
        Ok(constraint) => {
            let mut report = format!("{} {}", style("Valid:").green().bold(), constraint.describe());
            if !constraint.message().is_empty() {
                report.push_str(&format!("\n  message: {}", constraint.message()));
            }
            (0, report)
        }
        Err(e) if as_json => (EXIT_INVALID, json!({"valid": false, "error": e.to_string()}).to_string()),
        Err(e) => (EXIT_INVALID, format!("{} {}", style("Invalid:").red().bold(), e)),
    }
}

pub fn execute(args: CheckConstraintArgs) -> Result<i32> {
    let raw = read_input(&args.file)?;
    let (code, report) = check(&raw, args.json);
    if code == 0 {
        println!("{}", report);
    } else {
        eprintln!("{}", report);
    }
    Ok(code)
}
