//! sdport library exports.
//!
//! The binary is a thin clap layer over these modules; integration tests
//! drive [`install::Installer`] directly.

pub mod commands;
pub mod config;
pub mod deps;
pub mod formula;
pub mod install;
pub mod preflight;
pub mod process;
pub mod timing;
