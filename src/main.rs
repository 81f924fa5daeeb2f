//! sdport - installer for the macOS port of libsystemd.
//!
//! Downloads the port, checks its build dependencies, and drives
//! meson through configure, compile and install into a prefix.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sdport::commands;
use sdport::config::Config;
use sdport::formula::Formula;
use sdport::install::InstallError;

#[derive(Parser)]
#[command(name = "sdport")]
#[command(about = "Build and install libsystemd for macOS")]
#[command(
    after_help = "QUICK START:\n  sdport preflight  Check all dependencies\n  sdport install    Build and install\n  sdport verify     Check the install"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Install prefix (default: ~/.local/share/sdport/libsystemd/<version>)
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    /// Build from an unpacked source tree instead of downloading
    #[arg(long, global = true)]
    source_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and install (default)
    Install {
        /// Stream build tool output
        #[arg(short, long)]
        verbose: bool,

        /// Install missing dependencies with brew
        #[arg(long)]
        auto_install: bool,
    },

    /// Run preflight checks (verify all dependencies before install)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Check that the library directory exists under the prefix
    Verify,

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Remove the build tree (local source) and optionally the download cache
    Clean {
        /// Also remove cached source archives
        #[arg(long)]
        cache: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show formula metadata
    Formula {
        #[arg(long)]
        json: bool,
    },
    /// Show the meson setup arguments
    Options,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<InstallError>()
            .map(InstallError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let base_dir = std::env::current_dir()?;

    let mut config = Config::load(&base_dir);
    if let Some(prefix) = cli.prefix {
        config.prefix = Some(prefix);
    }
    if let Some(dir) = cli.source_dir {
        config.source_dir = Some(dir);
    }

    let command = cli.command.unwrap_or(Commands::Install {
        verbose: false,
        auto_install: false,
    });
    if let Commands::Install {
        verbose,
        auto_install,
    } = &command
    {
        config.verbose |= *verbose;
        config.auto_install |= *auto_install;
    }

    let formula = config.apply(Formula::libsystemd());

    match command {
        Commands::Install { .. } => commands::cmd_install(&formula, &config)?,
        Commands::Preflight { strict } => commands::cmd_preflight(&formula, &config, strict)?,
        Commands::Verify => commands::cmd_verify(&formula, &config)?,
        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Formula { json } => commands::show::ShowTarget::Formula { json },
                ShowTarget::Options => commands::show::ShowTarget::Options,
            };
            commands::cmd_show(&formula, &config, target)?;
        }
        Commands::Clean { cache } => commands::cmd_clean(&formula, &config, cache)?,
    }

    Ok(())
}
