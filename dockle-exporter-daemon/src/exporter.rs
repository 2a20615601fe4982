//! Exporter assembly and lifecycle management.
//!
//! The [`Exporter`] wires the collector to its production adapters,
//! binds the API listener, runs the scan scheduler and the HTTP server
//! side by side, and tears both down on a shutdown signal.
//!
//! # Shutdown
//!
//! `SIGTERM`/`SIGINT` cancel a single [`CancellationToken`]. The scheduler
//! stops starting new cycles, in-flight dockle processes observe the token,
//! and the API server drains open connections. `run` returns once both have
//! finished.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use dockle_exporter_collector::{
    BenchmarkCollector, BenchmarkCollectorBuilder, ContainerDiscovery, DockerDiscovery,
    DockleScanner, ImageScanner, ScanCollectorConfig,
};
use dockle_exporter_core::config::ExporterConfig;

use crate::{api, metrics_server};

/// Assembled exporter, ready to run.
pub struct Exporter<D: ContainerDiscovery, S: ImageScanner> {
    config: ExporterConfig,
    collector: Arc<BenchmarkCollector<D, S>>,
    listener: TcpListener,
    cancel: CancellationToken,
}

impl Exporter<DockerDiscovery, DockleScanner> {
    /// Build the production exporter from a validated configuration.
    ///
    /// Installs the self-monitoring recorder when `[metrics]` is enabled,
    /// connects to Docker and binds the API listener.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the recorder cannot be installed,
    /// Docker is unreachable or the API address cannot be bound.
    pub async fn build_from_config(config: ExporterConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let collector_config = ScanCollectorConfig::from_core(&config.collector);
        let discovery = DockerDiscovery::from_config(&collector_config)
            .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?;
        let scanner = DockleScanner::from_config(&collector_config);

        let collector = BenchmarkCollectorBuilder::new()
            .config(collector_config)
            .discovery(discovery)
            .scanner(scanner)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build collector: {}", e))?;

        tracing::info!(
            concurrency = collector.concurrency(),
            loop_interval_secs = config.collector.loop_interval_secs,
            dockle_path = %config.collector.dockle_path,
            "collector initialized"
        );

        Self::new(config, Arc::new(collector)).await
    }
}

impl<D: ContainerDiscovery, S: ImageScanner> Exporter<D, S> {
    /// Assemble an exporter around an existing collector.
    ///
    /// # Errors
    ///
    /// Returns an error if the API address cannot be bound.
    pub async fn new(config: ExporterConfig, collector: Arc<BenchmarkCollector<D, S>>) -> Result<Self> {
        let listener = api::bind(&config.api.listen_addr).await?;
        Ok(Self {
            config,
            collector,
            listener,
            cancel: CancellationToken::new(),
        })
    }

    /// Address the API listener is bound to.
    pub fn api_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the exporter when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Run until `SIGTERM` or `SIGINT` is received.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed or the API server fails.
    pub async fn run(self) -> Result<()> {
        let signals = ShutdownSignals::install()?;
        self.run_until(signals.recv()).await
    }

    /// Run until `shutdown` resolves, the cancel token fires or the API
    /// server stops on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the API server fails or exits before shutdown
    /// was requested.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = &'static str>,
    {
        let interval = self.collector.config().loop_interval;
        let scheduler = self.collector.start(self.cancel.clone(), interval);
        let mut server = tokio::spawn(api::serve(
            self.listener,
            self.collector.store(),
            self.cancel.clone(),
        ));

        tracing::info!("dockle-exporter running");

        let stop = wait_for_stop(shutdown, &self.cancel, &mut server).await;
        match &stop {
            Stop::Signal(signal) => tracing::info!(signal, "shutdown signal received"),
            Stop::Cancelled => tracing::info!("shutdown requested"),
            Stop::ServerExited(_) => {
                tracing::error!("API server stopped unexpectedly, shutting down");
            }
        }
        self.cancel.cancel();

        if let Err(e) = scheduler.await {
            tracing::error!(error = %e, "collector loop terminated abnormally");
        }

        let served = match stop {
            Stop::ServerExited(joined) => joined.map(|served| {
                served.and_then(|()| {
                    Err(anyhow::anyhow!(
                        "API server stopped before shutdown was requested"
                    ))
                })
            }),
            Stop::Signal(_) | Stop::Cancelled => server.await,
        }
        .map_err(|e| anyhow::anyhow!("API server task failed: {}", e))?;

        tracing::info!("dockle-exporter shut down");
        served
    }
}

/// Why the exporter is stopping.
#[derive(Debug)]
enum Stop {
    Signal(&'static str),
    Cancelled,
    ServerExited(Result<Result<()>, JoinError>),
}

/// Wait for a shutdown signal, cancellation or the API server task ending.
///
/// Cancellation is checked first, so a server that drains because the token
/// fired is reported as [`Stop::Cancelled`].
async fn wait_for_stop<F>(
    shutdown: F,
    cancel: &CancellationToken,
    server: &mut JoinHandle<Result<()>>,
) -> Stop
where
    F: Future<Output = &'static str>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Stop::Cancelled,
        signal = shutdown => Stop::Signal(signal),
        joined = server => Stop::ServerExited(joined),
    }
}

/// Installed `SIGTERM`/`SIGINT` handlers.
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal and return its name.
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}
