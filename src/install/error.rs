//! Installer error taxonomy. One variant per pipeline step.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A build tool that exited non-zero or could not be started.
#[derive(Debug, Clone)]
pub struct StepFailure {
    /// Command line that was run.
    pub command: String,
    /// Exit code; None if the process never started or was killed by a signal.
    pub code: Option<i32>,
    /// Tool diagnostics (captured stdout then stderr, or the spawn error).
    pub output: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "'{}' exited with code {}", self.command, code)?,
            None => write!(f, "'{}' did not run to completion", self.command)?,
        }
        let output = self.output.trim();
        if !output.is_empty() {
            write!(f, ":\n{}", output)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Host requirement not met: {0}")]
    Requirement(String),

    #[error("Missing dependencies: {}", .missing.join(", "))]
    DependencyMissing { missing: Vec<String> },

    #[error("Cannot set up build environment: {0:#}")]
    Environment(anyhow::Error),

    #[error("Failed to fetch source: {0:#}")]
    Fetch(anyhow::Error),

    #[error("Cannot verify source archive {url}: checksum '{checksum}' is not a SHA-256 digest (set SDPORT_ALLOW_UNVERIFIED=1 to build anyway)")]
    Checksum { url: String, checksum: String },

    #[error("Another install holds the lock at {}", .0.display())]
    Locked(PathBuf),

    #[error("Configure step failed: {0}")]
    Configuration(StepFailure),

    #[error("Compile step failed: {0}")]
    Compile(StepFailure),

    #[error("Install step failed: {0}")]
    Install(StepFailure),

    #[error("Verification failed: {} does not exist", .0.display())]
    Verification(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Process exit code for this failure.
    ///
    /// Build-step failures pass the tool's own exit code through.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(f) | Self::Compile(f) | Self::Install(f) => match f.code {
                Some(code) if code != 0 => code,
                _ => 1,
            },
            _ => 1,
        }
    }
}
