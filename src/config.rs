use dotenvy::dotenv;
use eyre::{eyre, Result};
use std::{env, time::Duration};
use tracing::info;

use crate::cli::{AnalysisMode, Cli};
use crate::gateway::DEFAULT_BASE_URL;

/// How much diagnostic detail components emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Observability {
    #[default]
    Quiet,
    /// Adds endpoint, response-preview and sample-record events at DEBUG.
    Verbose,
}

impl Observability {
    pub fn is_verbose(self) -> bool {
        self == Observability::Verbose
    }
}

#[derive(Clone)]
pub struct Config {
    pub etherscan_api_key: String,
    pub etherscan_base_url: String,
    pub request_timeout: Duration,
    pub port: u16,
    pub default_address: String,
    pub mode: AnalysisMode,
    pub observability: Observability,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("etherscan_api_key", &"<redacted>")
            .field("etherscan_base_url", &self.etherscan_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("port", &self.port)
            .field("default_address", &self.default_address)
            .field("mode", &self.mode)
            .field("observability", &self.observability)
            .finish()
    }
}

/// Load `.env` + environment, then apply command-line overrides.
pub fn load(cli: &Cli) -> Result<Config> {
    dotenv().ok();

    let etherscan_api_key = env::var("ETHERSCAN_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| eyre!("ETHERSCAN_API_KEY environment variable is required"))?;

    let etherscan_base_url =
        env::var("ETHERSCAN_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    // Per-attempt HTTP timeout (default: 60s)
    let request_timeout = Duration::from_secs(
        env::var("ETHERSCAN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60),
    );

    // API port (default: 8080), --port wins
    let port = cli.port.unwrap_or_else(|| {
        env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080)
    });

    let cfg = Config {
        etherscan_api_key,
        etherscan_base_url,
        request_timeout,
        port,
        default_address: cli.address.clone(),
        mode: cli.mode,
        observability: if cli.verbose {
            Observability::Verbose
        } else {
            Observability::Quiet
        },
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}
