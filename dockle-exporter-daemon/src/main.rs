use anyhow::Result;
use clap::Parser;

use dockle_exporter_core::config::ExporterConfig;
use dockle_exporter_daemon::cli::DaemonCli;
use dockle_exporter_daemon::exporter::Exporter;
use dockle_exporter_daemon::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 우선순위: CLI > 환경변수 > 파일 > 기본값
    let mut config = match &cli.config {
        Some(path) => ExporterConfig::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
        None => ExporterConfig::default(),
    };
    config.apply_env_overrides();
    cli.apply_overrides(&mut config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dockle-exporter starting");

    let exporter = Exporter::build_from_config(config).await?;
    exporter.run().await
}
