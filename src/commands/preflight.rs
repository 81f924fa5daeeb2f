//! Preflight command - runs preflight checks.

use anyhow::Result;

use crate::config::Config;
use crate::formula::Formula;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(formula: &Formula, config: &Config, strict: bool) -> Result<()> {
    if strict {
        preflight::run_preflight_or_fail(formula, config)?;
    } else {
        let report = preflight::run_preflight(formula, config);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to fail on them.");
        }
    }
    Ok(())
}
