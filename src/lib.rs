//! Beneficiary and payer analysis for Ethereum addresses, backed by the
//! Etherscan account API.

pub mod aggregator;
pub mod analyzer;
pub mod api;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod retry;

pub use analyzer::{AnalysisError, FundFlowAnalyzer};
pub use gateway::{EtherscanClient, GatewayConfig, GatewayError, TransactionSource};
pub use models::{CounterpartyAggregate, Direction, RawRecord, Role, TransactionDetail};
