//! CLI argument definitions for tailstat-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Tailstat access-log monitoring daemon.
///
/// Tails a web-server access log, aggregates per-status and per-path
/// traffic counters, and exposes them for Prometheus scraping.
#[derive(Parser, Debug)]
#[command(name = "tailstat-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to tailstat.toml configuration file.
    #[arg(short, long, default_value = "tailstat.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}
