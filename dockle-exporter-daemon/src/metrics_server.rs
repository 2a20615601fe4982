//! Self-monitoring metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose the exporter's own metrics (scan cycles, failures, durations)
//! on the monitor address. The benchmark gauge itself is served by [`crate::api`].
//!
//! # Usage
//!
//! ```ignore
//! let config = MetricsConfig::default();
//! install_metrics_recorder(&config)?;
//! // After this, all metrics::counter!(), metrics::gauge!(), metrics::histogram!() calls are recorded
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use dockle_exporter_core::config::MetricsConfig;
use dockle_exporter_core::metrics as m;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process.
///
/// # Errors
///
/// - Unsupported endpoint path or unparsable address
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }

    let addr = monitor_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "monitor endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    tracing::info!(listen_addr = %addr, "installing Prometheus metrics recorder");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::SCAN_CYCLE_DURATION_SECONDS.to_owned()),
            &m::SCAN_CYCLE_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    metrics::gauge!(m::BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");

    Ok(())
}

/// Resolve the monitor listen address from `[metrics]`.
///
/// IPv6 addresses are accepted with or without brackets.
pub fn monitor_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    let host = config.listen_addr.trim_start_matches('[').trim_end_matches(']');
    let ip = host
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address '{}': {}", host, e))?;
    Ok(SocketAddr::new(ip, config.port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(listen_addr: &str, port: u16) -> MetricsConfig {
        MetricsConfig {
            listen_addr: listen_addr.to_owned(),
            port,
            ..MetricsConfig::default()
        }
    }

    #[test]
    fn monitor_addr_ipv4() {
        let addr = monitor_addr(&config("127.0.0.1", 9522)).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9522");
    }

    #[test]
    fn monitor_addr_ipv6_with_and_without_brackets() {
        assert_eq!(
            monitor_addr(&config("::1", 9522)).unwrap().to_string(),
            "[::1]:9522"
        );
        assert_eq!(
            monitor_addr(&config("[::1]", 9522)).unwrap().to_string(),
            "[::1]:9522"
        );
    }

    #[test]
    fn monitor_addr_rejects_hostnames() {
        assert!(monitor_addr(&config("localhost", 9522)).is_err());
    }
}
