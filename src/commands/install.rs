//! Install command - runs the full install procedure.

use anyhow::Result;

use crate::config::Config;
use crate::formula::Formula;
use crate::install::Installer;

/// Execute the install command.
pub fn cmd_install(formula: &Formula, config: &Config) -> Result<()> {
    let report = Installer::new(formula, config).install()?;
    println!("\nInstall complete: {}", report.prefix.display());
    Ok(())
}
