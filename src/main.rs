use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eth_fund_flow::{
    api,
    cli::Cli,
    config,
    gateway::{EtherscanClient, GatewayConfig},
    FundFlowAnalyzer,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug for this crate with --verbose
    let default_filter = if cli.verbose {
        "info,eth_fund_flow=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Ethereum Fund Flow Analysis API starting...");

    let cfg = config::load(&cli)?;
    info!("  Default address: {}", cfg.default_address);
    info!("  Analysis mode: {}", cfg.mode);
    info!("  Port: {}", cfg.port);

    let client = EtherscanClient::new(GatewayConfig::from(&cfg))?;
    let analyzer = FundFlowAnalyzer::new(Arc::new(client), cfg.observability);

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { api::serve(cfg, analyzer).await }
    });

    // Graceful shutdown
    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Ethereum Fund Flow Analysis API stopped.");
    Ok(())
}
