use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use eth_fund_flow::api::{router, AppState};
use eth_fund_flow::cli::AnalysisMode;
use eth_fund_flow::config::Observability;
use eth_fund_flow::models::{TokenTransfer, Transaction};
use eth_fund_flow::{FundFlowAnalyzer, GatewayError, TransactionSource};

struct StaticSource {
    normal: Vec<Transaction>,
    fail_tokens: bool,
}

#[async_trait]
impl TransactionSource for StaticSource {
    async fn fetch_normal_transactions(
        &self,
        _address: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError> {
        Ok(self.normal.clone())
    }

    async fn fetch_internal_transactions(
        &self,
        _address: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, GatewayError> {
        Ok(Vec::new())
    }

    async fn fetch_token_transfers(
        &self,
        _address: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<TokenTransfer>, GatewayError> {
        if self.fail_tokens {
            Err(GatewayError::RateLimited)
        } else {
            Ok(Vec::new())
        }
    }
}

fn app(fail_tokens: bool, mode: AnalysisMode, default_address: &str) -> axum::Router {
    let source = StaticSource {
        normal: vec![Transaction {
            hash: "h1".to_string(),
            time_stamp: "1690000000".to_string(),
            from: "0xA".to_string(),
            to: "0xB".to_string(),
            value: "1000000000000000000".to_string(),
            is_error: "0".to_string(),
            ..Default::default()
        }],
        fail_tokens,
    };
    router(AppState {
        analyzer: FundFlowAnalyzer::new(Arc::new(source), Observability::Quiet),
        default_address: default_address.to_string(),
        mode,
    })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, body) = get(app(false, AnalysisMode::Both, ""), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn beneficiary_returns_success_envelope() {
    let (status, body) = get(
        app(false, AnalysisMode::Both, ""),
        "/beneficiary?address=0xa",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!({
            "message": "success",
            "data": [{
                "beneficiary_address": "0xB",
                "amount": 1.0,
                "transactions": [{
                    "tx_amount": 1.0,
                    "date_time": "2023-07-22 04:26:40",
                    "transaction_id": "h1"
                }]
            }]
        })
    );
}

#[tokio::test]
async fn payer_with_no_incoming_records_is_empty() {
    let (status, body) = get(app(false, AnalysisMode::Both, ""), "/payer?address=0xA").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"message": "success", "data": []}));
}

#[tokio::test]
async fn missing_address_is_bad_request() {
    for uri in ["/beneficiary", "/payer?address="] {
        let (status, body) = get(app(false, AnalysisMode::Both, ""), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body,
            json!({"message": "error", "error": "address parameter is required"})
        );
    }
}

#[tokio::test]
async fn core_failure_is_internal_server_error() {
    let (status, body) = get(app(true, AnalysisMode::Both, ""), "/beneficiary?address=0xA").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "error");
    assert_eq!(
        body["error"],
        "error fetching token transfers: etherscan API rate limit exceeded, please try again later"
    );
}

#[tokio::test]
async fn home_page_shows_mode_and_escaped_address() {
    let (status, body) = get(app(false, AnalysisMode::Payer, "0xabc<b>"), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Current analysis mode: <strong>payer</strong>"));
    assert!(body.contains("/payer?address=0xabc&lt;b&gt;"));
    assert!(!body.contains("0xabc<b>"));
}

#[tokio::test]
async fn analyze_default_buttons_follow_mode() {
    let (status, body) = get(
        app(false, AnalysisMode::Beneficiary, "0xabc"),
        "/analyze-default",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"href="/beneficiary?address=0xabc""#));
    assert!(!body.contains("Analyze Payers"));

    let (_, body) = get(app(false, AnalysisMode::Both, "0xabc"), "/analyze-default").await;
    assert!(body.contains("Analyze Beneficiaries"));
    assert!(body.contains("Analyze Payers"));
}

#[tokio::test]
async fn analyze_default_absent_without_default_address() {
    let (status, _) = get(app(false, AnalysisMode::Both, ""), "/analyze-default").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
