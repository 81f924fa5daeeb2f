//! Declared build dependencies and how their presence is detected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to tell whether a dependency is present on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum Probe {
    /// An executable on the tool search path.
    Binary(String),
    /// A module known to `pkg-config --exists`.
    PkgConfig(String),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(name) => write!(f, "binary '{name}'"),
            Self::PkgConfig(name) => write!(f, "pkg-config module '{name}'"),
        }
    }
}

/// A named package the build needs, e.g. `meson` or `util-linux`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name, as the package manager knows it.
    pub name: String,
    pub probe: Probe,
}

impl Dependency {
    pub fn binary(name: &str, binary: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: Probe::Binary(binary.to_string()),
        }
    }

    pub fn pkg_config(name: &str, module: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: Probe::PkgConfig(module.to_string()),
        }
    }
}

/// Host platform constraint (`depends_on :macos`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    MacOS,
}

impl Requirement {
    /// Whether the current host satisfies the requirement.
    pub fn satisfied(&self) -> bool {
        match self {
            Self::MacOS => cfg!(target_os = "macos"),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOS => f.write_str("macOS"),
        }
    }
}

/// Dependencies of the libsystemd port, in declaration order.
pub fn libsystemd_dependencies() -> Vec<Dependency> {
    vec![
        // GNU realpath is needed by the port's build scripts
        Dependency::binary("coreutils", "grealpath"),
        Dependency::pkg_config("libgcrypt", "libgcrypt"),
        Dependency::pkg_config("libxcrypt", "libxcrypt"),
        Dependency::binary("ccrypt", "ccrypt"),
        Dependency::binary("gettext", "msgfmt"),
        // provides libmount
        Dependency::pkg_config("util-linux", "mount"),
        Dependency::binary("meson", "meson"),
        Dependency::binary("ninja", "ninja"),
        Dependency::binary("pkg-config", "pkg-config"),
        Dependency::binary("python@3.12", "python3.12"),
        Dependency::binary("jinja2-cli", "jinja2"),
    ]
}
