//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `install` - Run the install procedure (default)
//! - `preflight` - Run preflight checks
//! - `verify` - Post-install check only
//! - `show` - Display configuration, formula, options
//! - `clean` - Remove build tree and download cache

pub mod clean;
mod install;
mod preflight;
pub mod show;
mod verify;

pub use clean::cmd_clean;
pub use install::cmd_install;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
pub use verify::cmd_verify;
