//! The libsystemd package recipe.
//!
//! A [`Formula`] is pure data: where the source lives, what must be on the
//! host before building, and the fixed options the configure step receives.
//! The installer consumes it read-only.

mod dependency;
mod options;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub use dependency::{libsystemd_dependencies, Dependency, Probe, Requirement};
pub use options::{BuildConfiguration, OptionValue, DISABLED_FEATURES};

pub const LIBSYSTEMD_URL: &str =
    "https://github.com/open-sources-port/systemd-port/archive/refs/tags/v0.1.0.tar.gz";

/// The recipe as published never had a real digest.
pub const LIBSYSTEMD_SHA256: &str = "PUT_REAL_SHA256_HERE";

/// SHA-256 digest of a source archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Checksum {
    Sha256(String),
    /// Not a 64-digit hex string; the archive cannot be verified.
    Invalid(String),
}

impl Checksum {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::Sha256(raw.to_ascii_lowercase())
        } else {
            Self::Invalid(raw.to_string())
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Sha256(_))
    }
}

impl From<String> for Checksum {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Checksum> for String {
    fn from(c: Checksum) -> Self {
        match c {
            Checksum::Sha256(s) | Checksum::Invalid(s) => s,
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(s) => f.write_str(s),
            Self::Invalid(s) => write!(f, "{s} (invalid)"),
        }
    }
}

/// Where the source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Tarball to download and verify.
    Archive { url: String, sha256: Checksum },
    /// An already unpacked tree. Never cleaned up by sdport.
    Local(PathBuf),
}

/// Package recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub desc: String,
    pub homepage: String,
    pub license: String,
    pub source: Source,
    /// Directory inside the source tree that holds `meson.build`.
    pub subdir: Option<String>,
    pub requirements: Vec<Requirement>,
    pub dependencies: Vec<Dependency>,
}

impl Formula {
    /// The macOS libsystemd port.
    pub fn libsystemd() -> Self {
        Self {
            name: "libsystemd".to_string(),
            desc: "Port of systemd libsystemd components to macOS".to_string(),
            homepage: "https://github.com/open-sources-port/systemd-port".to_string(),
            license: "LGPL-2.1-or-later".to_string(),
            source: Source::Archive {
                url: LIBSYSTEMD_URL.to_string(),
                sha256: Checksum::parse(LIBSYSTEMD_SHA256),
            },
            subdir: Some("macos-homebrew".to_string()),
            requirements: vec![Requirement::MacOS],
            dependencies: libsystemd_dependencies(),
        }
    }

    /// Version parsed from the archive URL (`.../v0.1.0.tar.gz` -> `0.1.0`).
    pub fn version(&self) -> Option<String> {
        match &self.source {
            Source::Archive { url, .. } => version_from_url(url),
            Source::Local(_) => None,
        }
    }

    /// Build configuration for an install under `prefix`.
    pub fn build_configuration(&self, prefix: &Path) -> BuildConfiguration {
        BuildConfiguration::libsystemd(prefix)
    }

    /// Directory inside an unpacked tree where meson runs.
    pub fn project_dir(&self, source_root: &Path) -> PathBuf {
        match &self.subdir {
            Some(sub) => source_root.join(sub),
            None => source_root.to_path_buf(),
        }
    }

    /// Print metadata for `sdport show formula`.
    pub fn print(&self) {
        println!("{}: {}", self.name, self.desc);
        println!("  Homepage: {}", self.homepage);
        println!("  License:  {}", self.license);
        if let Some(version) = self.version() {
            println!("  Version:  {}", version);
        }
        match &self.source {
            Source::Archive { url, sha256 } => {
                println!("  Source:   {}", url);
                println!("  SHA-256:  {}", sha256);
            }
            Source::Local(path) => println!("  Source:   {} (local)", path.display()),
        }
        for req in &self.requirements {
            println!("  Requires: {}", req);
        }
        println!("  Dependencies:");
        for dep in &self.dependencies {
            println!("    {} ({})", dep.name, dep.probe);
        }
    }
}

fn version_from_url(url: &str) -> Option<String> {
    let file = url.rsplit('/').next()?;
    let stem = [".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".zip"]
        .iter()
        .find_map(|ext| file.strip_suffix(ext))?;
    let version = stem.rsplit('-').next().unwrap_or(stem);
    let version = version.strip_prefix('v').unwrap_or(version);
    if version.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        Some(version.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_tag_url() {
        assert_eq!(Formula::libsystemd().version().as_deref(), Some("0.1.0"));
        assert_eq!(
            version_from_url("https://example.org/pkg-2.4.1.tar.xz").as_deref(),
            Some("2.4.1")
        );
        assert_eq!(version_from_url("https://example.org/latest.tar.gz"), None);
    }

    #[test]
    fn test_placeholder_checksum_is_invalid() {
        assert!(!Checksum::parse(LIBSYSTEMD_SHA256).is_valid());
        let good = "A".repeat(64);
        assert_eq!(Checksum::parse(&good), Checksum::Sha256("a".repeat(64)));
    }

    #[test]
    fn test_project_dir_uses_subdir() {
        let formula = Formula::libsystemd();
        assert_eq!(
            formula.project_dir(Path::new("/src")),
            PathBuf::from("/src/macos-homebrew")
        );
    }

    #[test]
    fn test_formula_serializes_to_json() {
        let json = serde_json::to_value(Formula::libsystemd()).unwrap();
        assert_eq!(json["name"], "libsystemd");
        assert_eq!(json["requirements"][0], "macos");
        assert_eq!(json["source"]["archive"]["sha256"], LIBSYSTEMD_SHA256);
    }
}
