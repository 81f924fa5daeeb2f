//! Verify command - the formula's post-install test on its own.

use anyhow::Result;

use crate::config::Config;
use crate::formula::Formula;
use crate::install::{self, Installer};

pub fn cmd_verify(formula: &Formula, config: &Config) -> Result<()> {
    let build_config = Installer::new(formula, config).build_configuration();
    println!("Verifying {} at {}...", formula.name, build_config.prefix.display());
    install::verify(&build_config)?;
    println!("OK");
    Ok(())
}
