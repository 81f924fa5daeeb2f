//! Clean command - removes the build tree and download cache.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::formula::{Formula, Source};
use crate::install::BUILD_DIR;

/// Execute the clean command.
pub fn cmd_clean(formula: &Formula, config: &Config, cache: bool) -> Result<()> {
    match &formula.source {
        Source::Local(root) => {
            let build_dir = formula.project_dir(root).join(BUILD_DIR);
            remove_dir("build tree", &build_dir)?;
        }
        // Archive builds happen in a temp dir that is already gone
        Source::Archive { .. } => println!("No build tree to clean (archive source)."),
    }

    if cache {
        remove_dir("download cache", &config.cache_dir)?;
    }
    Ok(())
}

fn remove_dir(what: &str, dir: &Path) -> Result<()> {
    if dir.exists() {
        println!("Removing {} {}...", what, dir.display());
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    } else {
        println!("[SKIP] No {} at {}", what, dir.display());
    }
    Ok(())
}
