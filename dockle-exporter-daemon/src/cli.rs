//! CLI argument definitions for dockle-exporter.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Flags take precedence over the config file and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use dockle_exporter_core::config::ExporterConfig;

/// Prometheus exporter for dockle CIS benchmarks.
///
/// Periodically scans every image running on the Docker host with dockle
/// and exposes the findings as `dockle_cis_benchmarks_total`.
#[derive(Parser, Debug, Default)]
#[command(name = "dockle-exporter")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to dockle-exporter.toml. Built-in defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address serving the benchmark metrics (host:port).
    #[arg(long)]
    pub api_address: Option<String>,

    /// Address serving the exporter's own metrics (host:port).
    #[arg(long)]
    pub monitor_address: Option<String>,

    /// Maximum number of dockle processes running at once.
    #[arg(long)]
    pub dockle_concurrency: Option<usize>,

    /// Seconds between scan cycles.
    #[arg(long)]
    pub collector_loop_interval: Option<u64>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate configuration and exit without starting the exporter.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply CLI overrides on top of a loaded configuration.
    ///
    /// `--verbose` wins over `--log-level`.
    ///
    /// # Errors
    ///
    /// Returns an error if `--monitor-address` is not a valid socket address.
    pub fn apply_overrides(&self, config: &mut ExporterConfig) -> Result<()> {
        if let Some(addr) = &self.api_address {
            config.api.listen_addr.clone_from(addr);
        }

        if let Some(addr) = &self.monitor_address {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid --monitor-address '{}': {}", addr, e))?;
            config.metrics.listen_addr = addr.ip().to_string();
            config.metrics.port = addr.port();
        }

        if let Some(concurrency) = self.dockle_concurrency {
            config.collector.concurrency = concurrency;
        }

        if let Some(interval) = self.collector_loop_interval {
            config.collector.loop_interval_secs = interval;
        }

        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }

        if self.verbose {
            config.general.log_level = "debug".to_owned();
        }

        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }

        Ok(())
    }
}
