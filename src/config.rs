//! Configuration management for sdport.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::formula::{Checksum, Formula, Probe, Source};

#[cfg(target_os = "macos")]
const DEFAULT_CC: &str = "clang";
#[cfg(target_os = "macos")]
const DEFAULT_CXX: &str = "clang++";
#[cfg(not(target_os = "macos"))]
const DEFAULT_CC: &str = "cc";
#[cfg(not(target_os = "macos"))]
const DEFAULT_CXX: &str = "c++";

/// sdport configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Install prefix override (SDPORT_PREFIX)
    pub prefix: Option<PathBuf>,
    /// Use an unpacked source tree instead of downloading (SDPORT_SOURCE_DIR)
    pub source_dir: Option<PathBuf>,
    /// Archive URL override (SDPORT_SOURCE_URL)
    pub source_url: Option<String>,
    /// Archive digest override (SDPORT_SOURCE_SHA256)
    pub source_sha256: Option<String>,
    /// Build from an archive whose digest cannot be checked
    pub allow_unverified: bool,
    /// Install missing dependencies with brew
    pub auto_install: bool,
    /// GNU coreutils `gnubin` directory (SDPORT_GNUBIN)
    pub gnubin: Option<PathBuf>,
    /// Build tool program (SDPORT_MESON)
    pub meson: String,
    /// C compiler
    pub cc: String,
    /// C++ compiler
    pub cxx: String,
    /// Tool search path handed to children (PATH)
    pub search_path: OsString,
    /// Download cache (~/.cache/sdport)
    pub cache_dir: PathBuf,
    /// Stream tool output instead of capturing it
    pub verbose: bool,
}

impl Config {
    /// Load configuration from .env file and environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if let Ok(iter) = dotenvy::from_path_iter(&env_path) {
            for (key, value) in iter.flatten() {
                env_vars.insert(key, value);
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        Self::from_vars(&env_vars, base_dir)
    }

    /// Build a config from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>, base_dir: &Path) -> Self {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let path = |key: &str| {
            get(key).map(|s| {
                let path = PathBuf::from(s);
                if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                }
            })
        };
        let flag = |key: &str| {
            get(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("sdport");

        Self {
            prefix: path("SDPORT_PREFIX"),
            source_dir: path("SDPORT_SOURCE_DIR"),
            source_url: get("SDPORT_SOURCE_URL"),
            source_sha256: get("SDPORT_SOURCE_SHA256"),
            allow_unverified: flag("SDPORT_ALLOW_UNVERIFIED"),
            auto_install: flag("SDPORT_AUTO_INSTALL"),
            gnubin: path("SDPORT_GNUBIN"),
            meson: get("SDPORT_MESON").unwrap_or_else(|| "meson".to_string()),
            cc: get("CC").unwrap_or_else(|| DEFAULT_CC.to_string()),
            cxx: get("CXX").unwrap_or_else(|| DEFAULT_CXX.to_string()),
            search_path: get("PATH")
                .map(OsString::from)
                .unwrap_or_else(|| OsString::from("/usr/bin:/bin")),
            cache_dir,
            verbose: flag("SDPORT_VERBOSE"),
        }
    }

    /// Apply source and build-tool overrides to a formula.
    pub fn apply(&self, mut formula: Formula) -> Formula {
        // The dependency check must find the meson that will actually run
        for dep in formula.dependencies.iter_mut().filter(|d| d.name == "meson") {
            dep.probe = Probe::Binary(self.meson.clone());
        }

        if let Some(dir) = &self.source_dir {
            formula.source = Source::Local(dir.clone());
            return formula;
        }
        if let Source::Archive { url, sha256 } = &mut formula.source {
            if let Some(new_url) = &self.source_url {
                *url = new_url.clone();
            }
            if let Some(digest) = &self.source_sha256 {
                *sha256 = Checksum::parse(digest);
            }
        }
        formula
    }

    /// Install prefix for `formula`.
    pub fn prefix_for(&self, formula: &Formula) -> PathBuf {
        if let Some(prefix) = &self.prefix {
            return prefix.clone();
        }
        let root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/usr/local"))
            .join("sdport")
            .join(&formula.name);
        match formula.version() {
            Some(v) => root.join(v),
            None => root.join("HEAD"),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self, formula: &Formula) {
        println!("Configuration:");
        println!("  PREFIX: {}", self.prefix_for(formula).display());
        match &self.source_dir {
            Some(dir) => println!("  SOURCE_DIR: {}", dir.display()),
            None => println!("  SOURCE_DIR: (download)"),
        }
        println!("  CC: {}", self.cc);
        println!("  CXX: {}", self.cxx);
        println!("  MESON: {}", self.meson);
        match &self.gnubin {
            Some(dir) => println!("  GNUBIN: {}", dir.display()),
            None => println!("  GNUBIN: (auto)"),
        }
        println!("  AUTO_INSTALL: {}", self.auto_install);
        println!("  ALLOW_UNVERIFIED: {}", self.allow_unverified);
        println!("  CACHE: {}", self.cache_dir.display());
    }
}
