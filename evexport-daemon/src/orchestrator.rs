//! Daemon orchestration -- assembly, lifecycle, and shutdown ordering.
//!
//! The [`Orchestrator`] wires the host event source into the exporter
//! service and owns their lifecycles.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (if enabled)
//! 2. Exporter service (opens the transport)
//! 3. Event source (starts producing)
//!
//! # Shutdown Order (producer first)
//!
//! 1. Event source stops reading
//! 2. Exporter service drains accepted events, final flush, closes transport
//! 3. Transport writers linger until queued messages are written or time runs out

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use evexport_core::config::EvexportConfig;
use evexport_core::metrics as m;
use evexport_core::pipeline::{HealthStatus, Pipeline};
use evexport_exporter::{
    Endpoint, ExportStats, ExporterService, ExporterServiceBuilder, SocketConnector,
};

use crate::metrics_server;
use crate::source::{self, InputSource, LineReceiver, SourceReport};

/// Extra time allowed on top of `linger_ms` for transport writers to exit.
const WRITER_EXIT_GRACE: Duration = Duration::from_secs(1);

/// Interval for refreshing the uptime gauge.
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Why the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// SIGTERM or SIGINT.
    Signal(&'static str),
    /// The input reached end of file.
    InputClosed,
}

/// Validate the configuration, including that the endpoint can be opened.
///
/// Catches unsupported schemes and malformed `host:port` at config time
/// instead of at transport start.
pub fn validate_config(config: &EvexportConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    config
        .exporter
        .endpoint
        .parse::<Endpoint>()
        .map_err(|e| anyhow::anyhow!("config validation failed: exporter.endpoint: {}", e))?;
    Ok(())
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: EvexportConfig,
    /// Exporter service (owns the exporter task).
    service: ExporterService<SocketConnector>,
    /// Shared connector, used to wait for transport writers on shutdown.
    connector: SocketConnector,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = EvexportConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: EvexportConfig) -> Result<Self> {
        validate_config(&config)?;

        // Install metrics recorder before any component records
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_build_info();
        }

        let connector = SocketConnector::new();
        let (service, _handle) = ExporterServiceBuilder::new(connector.clone())
            .config(config.exporter.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build exporter service: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(4);

        tracing::info!(endpoint = %config.exporter.endpoint, "orchestrator initialized");

        Ok(Self {
            config,
            service,
            connector,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start the exporter, pump `input` into it, and wait for SIGTERM/SIGINT
    /// or the end of the input.
    ///
    /// Returns after the exporter has been stopped and transport writers
    /// have finished (or their linger time ran out).
    pub async fn run(&mut self, input: InputSource) -> Result<ShutdownTrigger> {
        let lines = input.open()?;
        self.run_until(lines, async {
            wait_for_shutdown_signal().await.map(ShutdownTrigger::Signal)
        })
        .await
    }

    /// Like [`run`](Self::run), with an explicit shutdown future.
    ///
    /// The input may still be open when `shutdown` resolves; its reader
    /// thread is left behind and does not delay the return.
    pub async fn run_until<F>(
        &mut self,
        lines: LineReceiver,
        shutdown: F,
    ) -> Result<ShutdownTrigger>
    where
        F: Future<Output = Result<ShutdownTrigger>>,
    {
        self.service
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start exporter service: {}", e))?;

        let mut source_task = tokio::spawn(source::pump(
            lines,
            self.service.handle(),
            self.shutdown_tx.subscribe(),
        ));

        let uptime_task = if self.config.metrics.enabled {
            Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        tracing::info!("entering main event loop");
        let mut source_result = None;
        let trigger = tokio::select! {
            trigger = shutdown => trigger?,
            joined = &mut source_task => {
                source_result = Some(joined);
                ShutdownTrigger::InputClosed
            }
        };
        tracing::info!(trigger = ?trigger, "shutdown triggered");

        let _ = self.shutdown_tx.send(());

        let joined = match source_result {
            Some(joined) => joined,
            None => source_task.await,
        };
        match joined {
            Ok(Ok(report)) => log_source_report(&report),
            Ok(Err(e)) => tracing::error!(error = %e, "event source failed"),
            Err(e) => tracing::error!(error = %e, "event source task panicked"),
        }

        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        self.shutdown().await?;
        Ok(trigger)
    }

    /// Stop the exporter and wait for transport writers to drain.
    async fn shutdown(&mut self) -> Result<()> {
        self.service
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop exporter service: {}", e))?;

        let linger = Duration::from_millis(self.config.exporter.linger_ms) + WRITER_EXIT_GRACE;
        if tokio::time::timeout(linger, self.connector.wait_writers())
            .await
            .is_err()
        {
            tracing::warn!(
                writers = self.connector.active_writers(),
                "transport writers still running after linger"
            );
        }

        if let Some(stats) = self.service.stats().await {
            log_final_stats(&stats);
        }
        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "evexport-daemon shut down"
        );
        Ok(())
    }

    /// Current exporter health.
    pub async fn health(&self) -> HealthStatus {
        self.service.health_check().await
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &EvexportConfig {
        &self.config
    }
}

fn log_source_report(report: &SourceReport) {
    tracing::info!(
        lines = report.lines,
        submitted = report.submitted,
        decode_errors = report.decode_errors,
        "event source finished"
    );
}

fn log_final_stats(stats: &ExportStats) {
    tracing::info!(
        state = stats.state.as_str(),
        events_sent = stats.events_sent,
        events_dropped = stats.events_dropped,
        "final export statistics"
    );
}

fn record_build_info() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Periodically refresh the uptime gauge until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs_f64());
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
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

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("CTRL_C")
}
