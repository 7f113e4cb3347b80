//! Command-line settings.
//!
//! Only the config file location and log verbosity come from the command
//! line; everything else lives in the TOML config.

use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Forward newly written exposures to a remote image viewer
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ginga-actor",
    about = "Forward newly written exposures to a remote image viewer",
    version
)]
pub struct Settings {
    /// Configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging verbosity as a numeric level (10 debug, 20 info, 30 warning, 40 error)
    #[arg(long = "logLevel", default_value = "20")]
    pub log_level: u8,
}

impl Settings {
    /// `tracing` filter directive for the numeric level.
    pub fn log_directive(&self) -> &'static str {
        level_directive(self.log_level)
    }
}

/// Map a numeric (syslog-like, multiples of ten) verbosity to a `tracing`
/// level name. Anything above 30 is treated as errors-only.
pub fn level_directive(level: u8) -> &'static str {
    match level {
        0..=10 => "debug",
        11..=20 => "info",
        21..=30 => "warn",
        _ => "error",
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
