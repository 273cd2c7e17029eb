use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::analyzer::{AnalysisError, FundFlowAnalyzer};
use crate::cli::AnalysisMode;
use crate::config::Config;
use crate::models::{CounterpartyAggregate, Role, TransactionDetail};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: FundFlowAnalyzer,
    pub default_address: String,
    pub mode: AnalysisMode,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: &'static str,
    pub data: Vec<CounterpartyData>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: &'static str,
    pub error: String,
}

/// Wire shape of one aggregate; the address key depends on the role.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CounterpartyData {
    Beneficiary {
        beneficiary_address: String,
        amount: f64,
        transactions: Vec<TransactionDetail>,
    },
    Payer {
        payer_address: String,
        amount: f64,
        transactions: Vec<TransactionDetail>,
    },
}

impl From<CounterpartyAggregate> for CounterpartyData {
    fn from(agg: CounterpartyAggregate) -> Self {
        let amount = agg.total_amount();
        let transactions = agg.transactions().to_vec();
        match agg.role {
            Role::Beneficiary => CounterpartyData::Beneficiary {
                beneficiary_address: agg.address,
                amount,
                transactions,
            },
            Role::Payer => CounterpartyData::Payer {
                payer_address: agg.address,
                amount,
                transactions,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("address parameter is required")]
    MissingAddress,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingAddress => StatusCode::BAD_REQUEST,
            ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            message: "error",
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "OK" }))
        .route("/beneficiary", get(beneficiary))
        .route("/payer", get(payer));

    if !state.default_address.is_empty() {
        app = app.route("/analyze-default", get(analyze_default));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(cfg: Config, analyzer: FundFlowAnalyzer) -> eyre::Result<()> {
    let app = router(AppState {
        analyzer,
        default_address: cfg.default_address.clone(),
        mode: cfg.mode,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn beneficiary(
    State(state): State<AppState>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    run_analysis(&state, q, Role::Beneficiary).await
}

async fn payer(
    State(state): State<AppState>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    run_analysis(&state, q, Role::Payer).await
}

async fn run_analysis(
    state: &AppState,
    q: AddressQuery,
    role: Role,
) -> Result<Json<SuccessResponse>, ApiError> {
    let address = q
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or(ApiError::MissingAddress)?;

    info!("Analyzing {} flows for address: {}", role, address);

    let aggregates = state.analyzer.analyze(&address, role).await.map_err(|e| {
        error!("Error analyzing {}: {}", role, e);
        ApiError::from(e)
    })?;

    Ok(Json(SuccessResponse {
        message: "success",
        data: aggregates.into_iter().map(CounterpartyData::from).collect(),
    }))
}

// ---------- HTML pages ----------

const PAGE_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
        h2 { color: #2980b9; }
        pre { background-color: #f8f8f8; border: 1px solid #ddd; padding: 10px; border-radius: 4px; overflow-x: auto; }
        .endpoint { background-color: #e9f7fe; border-left: 3px solid #3498db; padding: 15px; margin: 15px 0; }
        .example { font-family: monospace; background-color: #f5f5f5; padding: 10px; border-radius: 4px; margin: 10px 0; }
        .info { background-color: #f8f9fa; border-left: 5px solid #3498db; padding: 15px; margin: 15px 0; }
        .button { display: inline-block; padding: 10px 15px; background-color: #3498db; color: white; text-decoration: none; border-radius: 4px; margin: 10px 5px; }
        a { color: #3498db; text-decoration: none; }
"#;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let address_info = if state.default_address.is_empty() {
        String::new()
    } else {
        format!(
            "<p>Current address: <code>{}</code></p>",
            escape_html(&state.default_address)
        )
    };
    let example = if state.default_address.is_empty() {
        "0xYourEthereumAddressHere".to_string()
    } else {
        escape_html(&state.default_address)
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Ethereum Fund Flow Analysis API</title>
    <style>{style}</style>
</head>
<body>
    <h1>Ethereum Fund Flow Analysis API</h1>
    <p>This API analyzes the flow of funds for Ethereum addresses to determine beneficiary addresses and payers.</p>

    <div class="info">
        <p>Current analysis mode: <strong>{mode}</strong></p>
        {address_info}
    </div>

    <h2>Endpoints</h2>

    <div class="endpoint">
        <h3>Health Check</h3>
        <div class="example"><a href="/health" target="_blank">/health</a></div>
    </div>

    <div class="endpoint">
        <h3>Beneficiary Analysis</h3>
        <p>Identifies where funds are flowing to from a given address:</p>
        <div class="example">/beneficiary?address=&lt;ethereum_address&gt;</div>
        <div class="example"><a href="/beneficiary?address={example}" target="_blank">/beneficiary?address={example}</a></div>
    </div>

    <div class="endpoint">
        <h3>Payer Analysis</h3>
        <p>Identifies where funds are coming from to a given address:</p>
        <div class="example">/payer?address=&lt;ethereum_address&gt;</div>
        <div class="example"><a href="/payer?address={example}" target="_blank">/payer?address={example}</a></div>
    </div>

    <h2>Sample Ethereum Addresses for Testing</h2>
    <ul>
        <li><code>0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2</code> (WETH Contract)</li>
        <li><code>0x7a250d5630b4cf539739df2c5dacb4c659f2488d</code> (Uniswap V2 Router)</li>
        <li><code>0xb8901acb165ed027e32754e0ffe830802919727f</code> (Sample address)</li>
    </ul>

    <h2>Command Line Usage</h2>
    <pre>
  eth-fund-flow --address 0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2 --mode beneficiary
  eth-fund-flow --address 0x7a250d5630b4cf539739df2c5dacb4c659f2488d --mode payer
  eth-fund-flow --help</pre>
</body>
</html>
"#,
        style = PAGE_STYLE,
        mode = state.mode,
        address_info = address_info,
        example = example,
    ))
}

async fn analyze_default(State(state): State<AppState>) -> Html<String> {
    let address = escape_html(&state.default_address);

    let beneficiary_button = if state.mode.includes_beneficiary() {
        format!(
            r#"<a href="/beneficiary?address={address}" class="button">Analyze Beneficiaries</a>"#
        )
    } else {
        String::new()
    };
    let payer_button = if state.mode.includes_payer() {
        format!(r#"<a href="/payer?address={address}" class="button">Analyze Payers</a>"#)
    } else {
        String::new()
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Analyze Ethereum Address</title>
    <style>{style}</style>
</head>
<body>
    <h1>Analyze Ethereum Address</h1>

    <div class="info">
        <p>Ethereum address: <code>{address}</code></p>
        <p>Analysis mode: <code>{mode}</code></p>
    </div>

    <p>Click below to analyze this address:</p>

    {beneficiary_button}
    {payer_button}

    <p><a href="/">Back to Home</a></p>
</body>
</html>
"#,
        style = PAGE_STYLE,
        mode = state.mode,
    ))
}
