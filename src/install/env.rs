//! Toolchain and search path handed to build tools.
//!
//! Nothing here touches the environment of the running process. Each child
//! gets `CC`, `CXX` and a `PATH` with GNU coreutils in front.

use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::process::{self, Cmd};

const GNUBIN_FALLBACKS: &[&str] = &[
    "/opt/homebrew/opt/coreutils/libexec/gnubin",
    "/usr/local/opt/coreutils/libexec/gnubin",
];

/// Child environment for configure/compile/install.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    pub cc: String,
    pub cxx: String,
    /// GNU coreutils shadowing the platform tools, if found.
    pub gnubin: Option<PathBuf>,
    /// Full `PATH` for children.
    pub path: OsString,
}

impl BuildEnv {
    pub fn from_config(config: &Config) -> Result<Self> {
        let gnubin = find_gnubin(config);
        let path = match &gnubin {
            Some(dir) => process::prepend_path(dir, &config.search_path)?,
            None => {
                eprintln!("  [WARN] GNU coreutils gnubin not found, using platform tools");
                config.search_path.clone()
            }
        };

        Ok(Self {
            cc: config.cc.clone(),
            cxx: config.cxx.clone(),
            gnubin,
            path,
        })
    }

    /// Attach the environment to a command.
    pub fn apply(&self, cmd: Cmd) -> Cmd {
        cmd.env("CC", self.cc.as_str())
            .env("CXX", self.cxx.as_str())
            .env("PATH", self.path.clone())
    }

    /// Resolve a program against the child `PATH`.
    ///
    /// Bare names that cannot be found are returned as-is so the spawn error
    /// surfaces from the step that needed them.
    pub fn program(&self, name: &str) -> PathBuf {
        if Path::new(name).components().count() > 1 {
            return PathBuf::from(name);
        }
        process::which_in(name, &self.path).unwrap_or_else(|| PathBuf::from(name))
    }
}

/// Locate `coreutils/libexec/gnubin`.
fn find_gnubin(config: &Config) -> Option<PathBuf> {
    if let Some(dir) = &config.gnubin {
        if dir.is_dir() {
            return Some(dir.clone());
        }
        eprintln!("  [WARN] SDPORT_GNUBIN={} does not exist", dir.display());
        return None;
    }

    if let Some(brew) = process::which_in("brew", &config.search_path) {
        let prefix = Cmd::new(brew)
            .args(["--prefix", "coreutils"])
            .allow_fail()
            .run()
            .ok()
            .filter(|r| r.success())
            .map(|r| PathBuf::from(r.stdout_trimmed()));
        if let Some(dir) = prefix.map(|p| p.join("libexec/gnubin")) {
            if dir.is_dir() {
                return Some(dir);
            }
        }
    }

    GNUBIN_FALLBACKS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}
