use anyhow::Result;
use clap::Parser;

use evexport_core::config::EvexportConfig;
use evexport_daemon::cli::DaemonCli;
use evexport_daemon::logging;
use evexport_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI 인자 순으로 덮어씀
    let mut config = EvexportConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    cli.apply_overrides(&mut config);
    orchestrator::validate_config(&config)?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "evexport-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    let trigger = orchestrator.run(cli.input_source()).await?;

    tracing::info!(trigger = ?trigger, "evexport-daemon exiting");
    Ok(())
}
