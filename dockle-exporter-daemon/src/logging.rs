//! Tracing subscriber setup for the exporter process.
//!
//! The level comes from `[general].log_level` after file, environment and
//! CLI layering, so `--verbose` has already turned it into `debug` by the
//! time [`init_tracing`] runs. Scan failures are logged per image at
//! `error`, cycle summaries at `info` and per-image results at `debug`.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dockle_exporter_core::config::GeneralConfig;

/// Install the process-wide subscriber.
///
/// Call once from `main`, after configuration is final. A `RUST_LOG`
/// directive replaces the configured level entirely, which allows
/// per-target filters such as `dockle_exporter_collector=debug,bollard=warn`.
///
/// `log_format` selects `json` lines for log shippers or `pretty` for a
/// terminal. Any other value is an error.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let output = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "pretty" => tracing_subscriber::fmt::layer().pretty().boxed(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("unknown log format"));
    }
}
