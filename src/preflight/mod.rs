//! Preflight checks for an install.
//!
//! Reports everything the install would trip over, without building.
//! Run with `sdport preflight` to check the host is ready.

mod types;

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::deps::DependencyResolver;
use crate::formula::Formula;
use crate::install::BuildEnv;
use crate::process;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(formula: &Formula, config: &Config) -> PreflightReport {
    let mut report = PreflightReport::default();

    println!("Running preflight checks...\n");

    for req in &formula.requirements {
        let name = format!("host: {}", req);
        if req.satisfied() {
            report.checks.push(CheckResult::pass(&name));
        } else {
            report.checks.push(CheckResult::fail(
                &name,
                &format!("{} only builds on {}", formula.name, req),
            ));
        }
    }

    let resolver = DependencyResolver::new(config);
    for dep in &formula.dependencies {
        match resolver.probe(dep) {
            Some(found) => report.checks.push(CheckResult::pass_with(&dep.name, &found)),
            None if config.auto_install => report.checks.push(CheckResult::warn(
                &dep.name,
                &format!("{} not found, will brew install", dep.probe),
            )),
            None => report.checks.push(CheckResult::fail(
                &dep.name,
                &format!("{} not found. Install with: brew install {}", dep.probe, dep.name),
            )),
        }
    }

    report.checks.extend(check_toolchain(config));
    report.checks.push(check_prefix(&config.prefix_for(formula)));

    report
}

fn check_toolchain(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let env = match BuildEnv::from_config(config) {
        Ok(env) => env,
        Err(e) => {
            results.push(CheckResult::fail("build environment", &format!("{:#}", e)));
            return results;
        }
    };

    for (var, compiler) in [("CC", &env.cc), ("CXX", &env.cxx)] {
        let name = format!("{} ({})", var, compiler);
        match process::which_in(compiler, &env.path) {
            Some(path) => results.push(CheckResult::pass_with(&name, &path.to_string_lossy())),
            None => results.push(CheckResult::fail(&name, "compiler not found")),
        }
    }

    match &env.gnubin {
        Some(dir) => results.push(CheckResult::pass_with("gnubin", &dir.to_string_lossy())),
        None => results.push(CheckResult::warn(
            "gnubin",
            "GNU coreutils not found; platform realpath will be used",
        )),
    }

    results
}

/// The prefix must be creatable and writable.
fn check_prefix(prefix: &Path) -> CheckResult {
    let name = format!("prefix {}", prefix.display());
    if let Err(e) = fs::create_dir_all(prefix) {
        return CheckResult::fail(&name, &format!("Cannot create: {}", e));
    }
    let probe = prefix.join(".preflight-test");
    match fs::write(&probe, "test") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            CheckResult::pass(&name)
        }
        Err(e) => CheckResult::fail(&name, &format!("Not writable: {}", e)),
    }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(formula: &Formula, config: &Config) -> Result<()> {
    let report = run_preflight(formula, config);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before installing.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
