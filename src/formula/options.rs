//! Build configuration passed to `meson setup`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Value of a `-D` project option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Features the macOS port cannot build. All are forced off.
pub const DISABLED_FEATURES: &[&str] = &[
    "selinux",
    "apparmor",
    "ima",
    "smack",
    "polkit",
    "libaudit",
    "resolve",
    "timesyncd",
    "machined",
    "logind",
    "networkd",
    "homed",
    "firstboot",
    "ldconfig",
];

/// Options handed to the configure step, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub buildtype: String,
    pub prefix: PathBuf,
    pub sysconfdir: PathBuf,
    pub localstatedir: PathBuf,
    /// Project options in declaration order.
    pub options: Vec<(String, OptionValue)>,
}

impl BuildConfiguration {
    /// The fixed libsystemd option set, rooted at `prefix`.
    pub fn libsystemd(prefix: &Path) -> Self {
        let mut options = vec![(
            "default-hierarchy".to_string(),
            OptionValue::Str("unified".to_string()),
        )];
        options.extend(
            DISABLED_FEATURES
                .iter()
                .map(|name| (name.to_string(), OptionValue::Bool(false))),
        );

        Self {
            buildtype: "debugoptimized".to_string(),
            prefix: prefix.to_path_buf(),
            sysconfdir: prefix.join("etc"),
            localstatedir: prefix.join("var"),
            options,
        }
    }

    /// Serialize to `meson setup` arguments (after the build dir).
    pub fn to_meson_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--buildtype={}", self.buildtype),
            format!("--prefix={}", self.prefix.display()),
            format!("--sysconfdir={}", self.sysconfdir.display()),
            format!("--localstatedir={}", self.localstatedir.display()),
        ];
        args.extend(
            self.options
                .iter()
                .map(|(key, value)| format!("-D{}={}", key, value)),
        );
        args
    }

    /// Expected library output directory.
    pub fn libdir(&self) -> PathBuf {
        self.prefix.join("lib")
    }
}
