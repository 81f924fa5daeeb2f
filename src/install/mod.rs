//! The install pipeline.
//!
//! Strictly linear and fail-fast:
//!
//! ```text
//! requirements -> dependencies -> build env -> source
//!     -> meson setup -> meson compile -> meson install -> verify
//! ```
//!
//! The first failing step aborts everything after it. Temporary source trees
//! and the prefix lock are released on every exit path by their `Drop` impls.

mod env;
mod error;
mod lock;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::deps::{source, DependencyResolver};
use crate::formula::{BuildConfiguration, Formula};
use crate::process::Cmd;
use crate::timing::Timer;

pub use env::BuildEnv;
pub use error::{InstallError, StepFailure};
pub use lock::{InstallLock, LOCK_FILE};

/// Build tree directory name, relative to the meson project.
pub const BUILD_DIR: &str = "build";

/// One of the three external build steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Configure,
    Compile,
    Install,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure => "Configure",
            Self::Compile => "Compile",
            Self::Install => "Install",
        }
    }

    fn error(self, failure: StepFailure) -> InstallError {
        match self {
            Self::Configure => InstallError::Configuration(failure),
            Self::Compile => InstallError::Compile(failure),
            Self::Install => InstallError::Install(failure),
        }
    }
}

/// What a successful install produced.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub prefix: PathBuf,
    /// Regular files under the prefix after install.
    pub files: usize,
}

/// Runs a formula's install procedure.
pub struct Installer<'a> {
    formula: &'a Formula,
    config: &'a Config,
}

impl<'a> Installer<'a> {
    pub fn new(formula: &'a Formula, config: &'a Config) -> Self {
        Self { formula, config }
    }

    pub fn prefix(&self) -> PathBuf {
        self.config.prefix_for(self.formula)
    }

    pub fn build_configuration(&self) -> BuildConfiguration {
        self.formula.build_configuration(&self.prefix())
    }

    /// Run the whole procedure.
    pub fn install(&self) -> Result<InstallReport, InstallError> {
        println!("=== Installing {} ===\n", self.formula.name);
        let prefix = self.prefix();

        for req in &self.formula.requirements {
            if !req.satisfied() {
                return Err(InstallError::Requirement(format!(
                    "{} requires {}",
                    self.formula.name, req
                )));
            }
        }

        println!("Resolving dependencies...");
        let timer = Timer::start("Dependencies");
        DependencyResolver::new(self.config).resolve_all(&self.formula.dependencies)?;
        timer.finish();

        let env = BuildEnv::from_config(self.config).map_err(InstallError::Environment)?;
        println!("\nToolchain: CC={} CXX={}", env.cc, env.cxx);
        if let Some(gnubin) = &env.gnubin {
            println!("GNU tools: {}", gnubin.display());
        }

        println!("\nPreparing source...");
        let source = source::prepare(self.formula, self.config)?;
        let project_dir = self.formula.project_dir(source.root());
        let build_config = self.formula.build_configuration(&prefix);

        let _lock = InstallLock::acquire(&prefix)?;
        let meson = env.program(&self.config.meson);
        println!();

        let mut setup_args = vec!["setup".to_string(), BUILD_DIR.to_string()];
        setup_args.extend(build_config.to_meson_args());
        if project_dir.join(BUILD_DIR).join("meson-private").is_dir() {
            println!("  Existing build tree found, reconfiguring");
            setup_args.push("--reconfigure".to_string());
        }

        self.run_step(Step::Configure, &env, Cmd::new(&meson).args(&setup_args).dir(&project_dir))?;
        self.run_step(
            Step::Compile,
            &env,
            Cmd::new(&meson).args(["compile", "-C", BUILD_DIR]).dir(&project_dir),
        )?;
        self.run_step(
            Step::Install,
            &env,
            Cmd::new(&meson).args(["install", "-C", BUILD_DIR]).dir(&project_dir),
        )?;

        verify(&build_config)?;
        let files = count_files(&prefix);
        println!("\n{} installed to {} ({} files)", self.formula.name, prefix.display(), files);

        Ok(InstallReport { prefix, files })
    }

    /// Run one external step and map a failure to its error variant.
    fn run_step(&self, step: Step, env: &BuildEnv, cmd: Cmd) -> Result<(), InstallError> {
        println!("{}...", step.name());
        let timer = Timer::start(step.name());
        let cmd = env.apply(cmd);
        let command = cmd.display();

        let failure = if self.config.verbose {
            println!("  $ {}", command);
            match cmd.allow_fail().run_interactive() {
                Ok(status) if status.success() => None,
                Ok(status) => Some(StepFailure {
                    command,
                    code: status.code(),
                    output: String::new(),
                }),
                Err(e) => Some(StepFailure {
                    command,
                    code: None,
                    output: format!("{:#}", e),
                }),
            }
        } else {
            match cmd.allow_fail().run() {
                Ok(result) if result.success() => None,
                Ok(result) => {
                    // ninja reports compiler errors on stdout
                    let output = [result.stdout_trimmed(), result.stderr_trimmed()]
                        .into_iter()
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n");
                    Some(StepFailure {
                        command,
                        code: result.status.code(),
                        output,
                    })
                }
                Err(e) => Some(StepFailure {
                    command,
                    code: None,
                    output: format!("{:#}", e),
                }),
            }
        };

        match failure {
            None => {
                timer.finish();
                Ok(())
            }
            Some(failure) => Err(step.error(failure)),
        }
    }
}

/// Post-install check: the library directory must exist.
pub fn verify(build_config: &BuildConfiguration) -> Result<(), InstallError> {
    let libdir = build_config.libdir();
    if libdir.is_dir() {
        println!("  ✓ {} exists", libdir.display());
        Ok(())
    } else {
        Err(InstallError::Verification(libdir))
    }
}

/// Regular files under `dir`, excluding the lock file.
fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() != LOCK_FILE)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_requires_lib_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = BuildConfiguration::libsystemd(tmp.path());

        assert!(matches!(
            verify(&config),
            Err(InstallError::Verification(p)) if p == tmp.path().join("lib")
        ));

        std::fs::create_dir_all(tmp.path().join("lib")).unwrap();
        verify(&config).unwrap();
    }

    #[test]
    fn test_verify_rejects_plain_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lib"), "").unwrap();
        let config = BuildConfiguration::libsystemd(tmp.path());
        assert!(verify(&config).is_err());
    }

    #[test]
    fn test_step_maps_to_error_variant() {
        let failure = StepFailure {
            command: "meson".into(),
            code: Some(1),
            output: String::new(),
        };
        assert!(matches!(
            Step::Configure.error(failure.clone()),
            InstallError::Configuration(_)
        ));
        assert!(matches!(Step::Compile.error(failure.clone()), InstallError::Compile(_)));
        assert!(matches!(Step::Install.error(failure), InstallError::Install(_)));
    }
}
