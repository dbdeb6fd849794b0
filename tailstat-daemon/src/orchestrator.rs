//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `tailstat-daemon`.
//! It loads configuration, installs the metrics recorder, builds the
//! log analyzer, manages startup/shutdown, and runs the main event loop
//! until a termination signal arrives.
//!
//! The analyzer itself never gives up: per-line and per-poll failures
//! are contained inside its tail loop. Only failures before the loop
//! first starts (bad config, uncreatable log directory) abort the
//! daemon with a non-zero exit so a process supervisor can restart it.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::broadcast;

use tailstat_core::config::TailstatConfig;
use tailstat_core::pipeline::Pipeline;
use tailstat_log_analyzer::{AnalyzerConfig, LogAnalyzer, LogAnalyzerBuilder, SharedStats};

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;

/// The main daemon orchestrator.
///
/// Owns the log analyzer and manages its complete lifecycle:
/// configuration loading, startup, health reporting, and graceful
/// shutdown on SIGTERM/SIGINT.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: TailstatConfig,
    /// The log analyzer module (absent when disabled in config).
    analyzer: Option<LogAnalyzer>,
    /// Shared statistics handle (same aggregator the analyzer writes to).
    stats: SharedStats,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("analyzer_present", &self.analyzer.is_some())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path to the `tailstat.toml` configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The analyzer fails to initialize
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = TailstatConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Useful for testing or when config has already been loaded.
    pub fn build_from_config(config: TailstatConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before the analyzer starts emitting
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let (shutdown_tx, _) = broadcast::channel(16);
        let stats = SharedStats::new();

        let analyzer = if config.analyzer.enabled {
            tracing::info!("initializing log analyzer");
            let analyzer_config = AnalyzerConfig::from_core(&config.analyzer);
            let analyzer = LogAnalyzerBuilder::new()
                .config(analyzer_config)
                .stats(stats.clone())
                .build()
                .map_err(|e| anyhow::anyhow!("failed to build log analyzer: {}", e))?;
            Some(analyzer)
        } else {
            tracing::warn!("log analyzer disabled in configuration");
            None
        };

        if config.metrics.enabled {
            record_daemon_metrics();
        }

        tracing::info!("orchestrator initialized");

        Ok(Self {
            config,
            analyzer,
            stats,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start the analyzer and enter the main event loop.
    ///
    /// This method blocks until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        // Write PID file if configured
        if !self.config.general.pid_file.is_empty() {
            let path = Path::new(&self.config.general.pid_file).to_path_buf();
            write_pid_file(&path)?;
        }

        // Start the analyzer; a failure here is fatal (first bootstrap)
        if let Some(analyzer) = self.analyzer.as_mut() {
            tracing::info!("starting log analyzer");
            if let Err(e) = analyzer.start().await {
                tracing::error!(error = %e, "log analyzer failed to start");
                if !self.config.general.pid_file.is_empty() {
                    remove_pid_file(Path::new(&self.config.general.pid_file));
                }
                return Err(e.into());
            }
        }

        // Spawn uptime updater task
        let mut uptime_updater_task = if self.config.metrics.enabled {
            let shutdown_rx = self.shutdown_tx.subscribe();
            Some(spawn_uptime_updater(self.start_time, shutdown_rx))
        } else {
            None
        };

        // Main event loop
        tracing::info!("entering main event loop");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        // Initiate shutdown
        let _ = self.shutdown_tx.send(());

        if let Some(task) = uptime_updater_task.take() {
            let _ = task.await;
        }

        // Stop the analyzer
        if let Some(analyzer) = self.analyzer.as_mut() {
            if let Err(e) = analyzer.stop().await {
                tracing::error!(error = %e, "failed to stop log analyzer");
            }
        }

        // Remove PID file
        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }

        tracing::info!("daemon shut down");
        Ok(())
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let mut modules = Vec::new();
        if let Some(analyzer) = self.analyzer.as_ref() {
            modules.push(ModuleHealth {
                name: "log-analyzer".to_owned(),
                enabled: true,
                status: analyzer.health_check().await,
            });
        }

        let overall_status = aggregate_status(&modules);
        let uptime_secs = self.start_time.elapsed().as_secs();

        if self.config.metrics.enabled {
            use tailstat_core::metrics as m;
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status: overall_status,
            uptime_secs,
            modules,
        }
    }

    /// Get a snapshot of the aggregated traffic statistics.
    pub fn stats_snapshot(&self) -> tailstat_core::types::StatsSnapshot {
        self.stats.snapshot()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &TailstatConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create file (prevents TOCTOU races)
/// - Verifies the created file is a regular file (prevents symlink attacks)
/// - Creates parent directory with restrictive permissions (0o700)
///
/// # Errors
///
/// Returns an error if the PID file cannot be written.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    // Create parent directory with restrictive permissions (0o700)
    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    // Atomically create file only if it doesn't exist (eliminates TOCTOU race)
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            // File already exists, read the existing PID for error message
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    // Verify the created file is a regular file (not a symlink or other special file)
    let metadata = file.metadata()?;
    if !metadata.is_file() {
        // Remove the non-regular file and return error
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file (possible symlink attack)",
            path.display()
        ));
    }

    // Set restrictive permissions on the PID file (0o600)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(permissions)?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Record daemon-level metrics (build info).
///
/// This should be called once during orchestrator initialization.
fn record_daemon_metrics() {
    use tailstat_core::metrics as m;

    // Build info (always 1, with version label)
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "daemon metrics recorded"
    );
}

/// Spawn a background task that periodically updates the uptime metric.
///
/// Updates every 10 seconds to keep the metric fresh for Prometheus scrapes.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use tailstat_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
