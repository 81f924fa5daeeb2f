//! Show command - displays information.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::formula::Formula;
use crate::install::{Installer, BUILD_DIR};

/// Show target for the show command.
pub enum ShowTarget {
    /// Resolved configuration
    Config,
    /// Formula metadata, optionally as JSON
    Formula { json: bool },
    /// `meson setup` arguments
    Options,
}

/// Execute the show command.
pub fn cmd_show(formula: &Formula, config: &Config, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(formula),
        ShowTarget::Formula { json: true } => {
            let out = serde_json::to_string_pretty(formula).context("Failed to serialize formula")?;
            println!("{}", out);
        }
        ShowTarget::Formula { json: false } => formula.print(),
        ShowTarget::Options => {
            let build_config = Installer::new(formula, config).build_configuration();
            println!("{} setup {}", config.meson, BUILD_DIR);
            for arg in build_config.to_meson_args() {
                println!("  {}", arg);
            }
        }
    }
    Ok(())
}
