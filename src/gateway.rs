// src/gateway.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{Config, Observability};
use crate::models::{RecordKind, TokenTransfer, Transaction};
use crate::retry::{retry_with_backoff, RetryError, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/api";

/// Most recent records fetched per source; older history is out of scope.
pub const PAGE_SIZE: u32 = 100;

/// Marker the explorer puts in `result` when the key's quota is spent.
pub const RATE_LIMIT_MARKER: &str = "rate limit reached";

const PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("etherscan API error: {0}")]
    Provider(String),
    #[error("etherscan API rate limit exceeded, please try again later")]
    RateLimited,
    #[error("etherscan API returned HTTP {0}")]
    Http(StatusCode),
    #[error("error decoding explorer response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request cancelled")]
    Cancelled,
}

/// Source of the three record streams for an address.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_normal_transactions(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError>;

    async fn fetch_internal_transactions(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError>;

    async fn fetch_token_transfers(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenTransfer>, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub observability: Observability,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            observability: Observability::Quiet,
        }
    }
}

impl From<&Config> for GatewayConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            base_url: cfg.etherscan_base_url.clone(),
            api_key: cfg.etherscan_api_key.clone(),
            timeout: cfg.request_timeout,
            retry: RetryPolicy::default(),
            observability: cfg.observability,
        }
    }
}

/// Etherscan `account` module client.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: Client,
    config: GatewayConfig,
}

impl EtherscanClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        // Each attempt gets its own timeout window.
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.without_url()))?;

        Ok(Self { client, config })
    }

    /// Fetch page 1 (newest first) of one record stream.
    async fn fetch_records<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, GatewayError> {
        let page_size = PAGE_SIZE.to_string();
        let query = [
            ("module", "account"),
            ("action", kind.action()),
            ("address", address),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("page", "1"),
            ("offset", page_size.as_str()),
            ("sort", "desc"),
            ("apikey", self.config.api_key.as_str()),
        ];

        let verbose = self.config.observability.is_verbose();
        if verbose {
            debug!(
                "📡 Fetching {} for {} → {}?module=account&action={}",
                kind,
                address,
                self.config.base_url,
                kind.action()
            );
        }

        let (status, body) = retry_with_backoff(&self.config.retry, cancel, || {
            let request = self.client.get(&self.config.base_url).query(&query);
            async move {
                let resp = request.send().await?;
                let status = resp.status();
                let text = resp.text().await?;
                Ok::<_, reqwest::Error>((status, text))
            }
        })
        .await
        .map_err(|e| match e {
            // The request URL carries the API key.
            RetryError::Exhausted { attempts, last } => GatewayError::Transport {
                attempts,
                source: last.without_url(),
            },
            RetryError::Cancelled => GatewayError::Cancelled,
        })?;

        if verbose {
            debug!("📩 Raw {} response: {}", kind, preview(&body));
        }

        if !status.is_success() {
            return Err(GatewayError::Http(status));
        }

        let records: Vec<T> = parse_envelope(&body)?;
        info!("Fetched {} {} for {}", records.len(), kind, address);
        Ok(records)
    }
}

#[async_trait]
impl TransactionSource for EtherscanClient {
    async fn fetch_normal_transactions(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError> {
        self.fetch_records(RecordKind::Normal, address, cancel).await
    }

    async fn fetch_internal_transactions(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError> {
        self.fetch_records(RecordKind::Internal, address, cancel).await
    }

    async fn fetch_token_transfers(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenTransfer>, GatewayError> {
        self.fetch_records(RecordKind::Token, address, cancel).await
    }
}

/// `{status, message, result}`; `result` is an array on success, often a string otherwise.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

fn is_no_records(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.starts_with("no transactions found") || message.starts_with("no records found")
}

/// Decode an explorer response body into records or a classified error.
pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, GatewayError> {
    let envelope: Envelope = serde_json::from_str(body)?;

    if envelope.status == "1" {
        return match envelope.result {
            Value::Null => Ok(Vec::new()),
            result => Ok(serde_json::from_value(result)?),
        };
    }

    if is_no_records(&envelope.message) {
        return Ok(Vec::new());
    }

    match envelope.result {
        Value::String(reason) if reason.to_ascii_lowercase().contains(RATE_LIMIT_MARKER) => {
            Err(GatewayError::RateLimited)
        }
        Value::String(reason) if !reason.trim().is_empty() => Err(GatewayError::Provider(reason)),
        _ => Err(GatewayError::Provider(envelope.message)),
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_successful_transaction_list() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "17000000",
                "timeStamp": "1690000000",
                "hash": "0xh1",
                "from": "0xA",
                "to": "0xB",
                "value": "1000000000000000000",
                "isError": "0",
                "gas": "21000"
            }]
        }"#;

        let txs: Vec<Transaction> = parse_envelope(body).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "0xh1");
        assert_eq!(txs[0].time_stamp, "1690000000");
        assert_eq!(txs[0].is_error, "0");
    }

    #[test]
    fn decodes_token_transfer_metadata() {
        let body = r#"{"status":"1","message":"OK","result":[{
            "timeStamp":"1690000000","hash":"0xt1","from":"0xA","to":"0xB",
            "value":"42","tokenName":"Tether USD","tokenSymbol":"USDT","tokenDecimal":"6",
            "contractAddress":"0xdac17f958d2ee523a2206206994597c13d831ec7"}]}"#;

        let transfers: Vec<TokenTransfer> = parse_envelope(body).unwrap();
        assert_eq!(transfers[0].token_symbol, "USDT");
        assert_eq!(transfers[0].token_decimal, "6");
    }

    #[test]
    fn no_transactions_found_is_empty_not_error() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        let txs: Vec<Transaction> = parse_envelope(body).unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn rate_limit_is_distinguished() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let err = parse_envelope::<Transaction>(body).unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited));
        assert_eq!(
            err.to_string(),
            "etherscan API rate limit exceeded, please try again later"
        );
    }

    #[test]
    fn provider_error_prefers_result_text() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        match parse_envelope::<Transaction>(body) {
            Err(GatewayError::Provider(msg)) => assert_eq!(msg, "Invalid API Key"),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn provider_error_falls_back_to_message() {
        let body = r#"{"status":"0","message":"Query Timeout occured","result":[]}"#;
        match parse_envelope::<TokenTransfer>(body) {
            Err(GatewayError::Provider(msg)) => assert_eq!(msg, "Query Timeout occured"),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_body_is_decode_error() {
        let err = parse_envelope::<Transaction>("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(PREVIEW_CHARS + 10);
        assert!(preview(&long).ends_with("... (truncated)"));
        assert_eq!(preview("short"), "short");
    }
}
