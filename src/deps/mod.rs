//! Dependency resolution for the build.
//!
//! Every declared dependency follows the same pattern:
//! 1. Probe for it on the configured tool search path
//! 2. If missing and auto-install is on, `brew install` it and probe again
//! 3. Otherwise report it missing
//!
//! Missing entries are collected so a single failure names all of them.

pub mod download;
pub mod source;

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Config;
use crate::formula::{Dependency, Probe};
use crate::install::InstallError;
use crate::process::{self, Cmd};

/// Outcome of resolving one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already present. Holds the binary path or module version.
    Found(String),
    /// Was missing, installed by brew, now present.
    Installed(String),
    /// Not present and not installable.
    Missing(String),
}

/// Resolves declared dependencies against the host.
pub struct DependencyResolver {
    search_path: OsString,
    auto_install: bool,
}

impl DependencyResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            search_path: config.search_path.clone(),
            auto_install: config.auto_install,
        }
    }

    /// Find an executable on the search path.
    pub fn find_binary(&self, name: &str) -> Option<PathBuf> {
        process::which_in(name, &self.search_path)
    }

    /// Check presence without installing anything.
    pub fn probe(&self, dep: &Dependency) -> Option<String> {
        match &dep.probe {
            Probe::Binary(name) => self
                .find_binary(name)
                .map(|p| p.to_string_lossy().into_owned()),
            Probe::PkgConfig(module) => {
                let pkg_config = self.find_binary("pkg-config")?;
                let result = Cmd::new(&pkg_config)
                    .args(["--modversion", module.as_str()])
                    .env("PATH", self.search_path.clone())
                    .allow_fail()
                    .run()
                    .ok()?;
                if result.success() {
                    Some(format!("{} {}", module, result.stdout_trimmed()))
                } else {
                    None
                }
            }
        }
    }

    /// Probe, and install through brew if allowed.
    pub fn resolve(&self, dep: &Dependency) -> Resolution {
        if let Some(found) = self.probe(dep) {
            return Resolution::Found(found);
        }

        if !self.auto_install {
            return Resolution::Missing(format!("{} not found", dep.probe));
        }

        let Some(brew) = self.find_binary("brew") else {
            return Resolution::Missing(format!(
                "{} not found and brew is unavailable",
                dep.probe
            ));
        };

        println!("  Installing {} with brew...", dep.name);
        let installed = Cmd::new(&brew)
            .args(["install", dep.name.as_str()])
            .env("PATH", self.search_path.clone())
            .error_msg(format!("brew install {} failed", dep.name))
            .run();
        if let Err(e) = installed {
            return Resolution::Missing(format!("{:#}", e));
        }

        match self.probe(dep) {
            Some(found) => Resolution::Installed(found),
            None => Resolution::Missing(format!(
                "installed {} but {} is still not found",
                dep.name, dep.probe
            )),
        }
    }

    /// Resolve every dependency in declaration order.
    ///
    /// Fails with [`InstallError::DependencyMissing`] naming every entry that
    /// could not be made available.
    pub fn resolve_all(&self, deps: &[Dependency]) -> Result<Vec<(String, Resolution)>, InstallError> {
        let mut resolved = Vec::with_capacity(deps.len());
        let mut missing = Vec::new();

        for dep in deps {
            let resolution = self.resolve(dep);
            match &resolution {
                Resolution::Found(detail) => println!("  ✓ {} ({})", dep.name, detail),
                Resolution::Installed(detail) => {
                    println!("  ✓ {} ({}, installed)", dep.name, detail)
                }
                Resolution::Missing(reason) => {
                    println!("  ✗ {}: {}", dep.name, reason);
                    missing.push(dep.name.clone());
                }
            }
            resolved.push((dep.name.clone(), resolution));
        }

        if !missing.is_empty() {
            return Err(InstallError::DependencyMissing { missing });
        }
        Ok(resolved)
    }
}
