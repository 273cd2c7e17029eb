use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::aggregate;
use crate::config::Observability;
use crate::gateway::{GatewayError, TransactionSource};
use crate::models::{CounterpartyAggregate, RawRecord, RecordKind, Role, TokenTransfer, Transaction};

const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("error fetching {kind}: {source}")]
    Fetch {
        kind: RecordKind,
        #[source]
        source: GatewayError,
    },
    #[error("fetch task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

enum Fetched {
    Normal(Vec<Transaction>),
    Internal(Vec<Transaction>),
    Token(Vec<TokenTransfer>),
}

async fn fetch_kind(
    source: &dyn TransactionSource,
    kind: RecordKind,
    address: &str,
    cancel: &CancellationToken,
) -> Result<Fetched, GatewayError> {
    Ok(match kind {
        RecordKind::Normal => {
            Fetched::Normal(source.fetch_normal_transactions(address, cancel).await?)
        }
        RecordKind::Internal => {
            Fetched::Internal(source.fetch_internal_transactions(address, cancel).await?)
        }
        RecordKind::Token => Fetched::Token(source.fetch_token_transfers(address, cancel).await?),
    })
}

/// Beneficiary / payer analysis over the three explorer streams.
#[derive(Clone)]
pub struct FundFlowAnalyzer {
    source: Arc<dyn TransactionSource>,
    observability: Observability,
}

impl FundFlowAnalyzer {
    pub fn new(source: Arc<dyn TransactionSource>, observability: Observability) -> Self {
        Self {
            source,
            observability,
        }
    }

    pub async fn analyze_beneficiaries(
        &self,
        address: &str,
    ) -> Result<Vec<CounterpartyAggregate>, AnalysisError> {
        self.analyze(address, Role::Beneficiary).await
    }

    pub async fn analyze_payers(
        &self,
        address: &str,
    ) -> Result<Vec<CounterpartyAggregate>, AnalysisError> {
        self.analyze(address, Role::Payer).await
    }

    /// Fetch all three streams concurrently, then aggregate for `role`.
    /// Any fetch failure fails the whole analysis; partial results are never returned.
    pub async fn analyze(
        &self,
        address: &str,
        role: Role,
    ) -> Result<Vec<CounterpartyAggregate>, AnalysisError> {
        info!("Starting {} analysis for {}", role, address);

        let records = self.fetch_all(address).await?;
        let aggregates = aggregate(address, &records, role.direction());

        info!(
            "Found {} {} addresses for {} ({} records scanned)",
            aggregates.len(),
            role,
            address,
            records.len()
        );
        if self.observability.is_verbose() {
            for (i, agg) in aggregates.iter().take(SAMPLE_LIMIT).enumerate() {
                debug!(
                    "{} {} - Address: {}, Total: {} ETH, Transactions: {}",
                    role,
                    i,
                    agg.address,
                    agg.total_amount(),
                    agg.transactions().len()
                );
            }
        }

        Ok(aggregates)
    }

    /// Records in scan order: normal, internal, token.
    async fn fetch_all(&self, address: &str) -> Result<Vec<RawRecord>, AnalysisError> {
        let cancel = CancellationToken::new();
        // Stops in-flight siblings on every early return.
        let _cancel_on_exit = cancel.clone().drop_guard();

        let mut tasks = JoinSet::new();
        for kind in [RecordKind::Normal, RecordKind::Internal, RecordKind::Token] {
            let source = Arc::clone(&self.source);
            let address = address.to_string();
            let cancel = cancel.child_token();
            tasks.spawn(async move {
                let fetched = tokio::select! {
                    _ = cancel.cancelled() => Err(GatewayError::Cancelled),
                    res = fetch_kind(source.as_ref(), kind, &address, &cancel) => res,
                };
                (kind, fetched)
            });
        }

        let mut normal = Vec::new();
        let mut internal = Vec::new();
        let mut tokens = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined? {
                (_, Ok(Fetched::Normal(txs))) => normal = txs,
                (_, Ok(Fetched::Internal(txs))) => internal = txs,
                (_, Ok(Fetched::Token(transfers))) => tokens = transfers,
                (kind, Err(source)) => {
                    warn!(
                        "Aborting analysis for {}: {} fetch failed: {}",
                        address, kind, source
                    );
                    cancel.cancel();
                    return Err(AnalysisError::Fetch { kind, source });
                }
            }
        }

        if self.observability.is_verbose() {
            self.log_samples(&normal, &internal, &tokens);
        }

        let mut records = Vec::with_capacity(normal.len() + internal.len() + tokens.len());
        records.extend(normal.into_iter().map(RawRecord::Normal));
        records.extend(internal.into_iter().map(RawRecord::Internal));
        records.extend(tokens.into_iter().map(RawRecord::Token));
        Ok(records)
    }

    fn log_samples(
        &self,
        normal: &[Transaction],
        internal: &[Transaction],
        tokens: &[TokenTransfer],
    ) {
        debug!(
            "Fetched {} normal, {} internal, {} token records",
            normal.len(),
            internal.len(),
            tokens.len()
        );
        for (i, tx) in normal.iter().take(SAMPLE_LIMIT).enumerate() {
            debug!(
                "Normal tx {} - From: {}, To: {}, Value: {}, Hash: {}, IsError: {}",
                i, tx.from, tx.to, tx.value, tx.hash, tx.is_error
            );
        }
        for (i, tx) in internal.iter().take(SAMPLE_LIMIT).enumerate() {
            debug!(
                "Internal tx {} - From: {}, To: {}, Value: {}, Hash: {}, IsError: {}",
                i, tx.from, tx.to, tx.value, tx.hash, tx.is_error
            );
        }
        for (i, t) in tokens.iter().take(SAMPLE_LIMIT).enumerate() {
            debug!(
                "Token transfer {} - From: {}, To: {}, Value: {}, Token: {} ({}), Hash: {}",
                i, t.from, t.to, t.value, t.token_name, t.token_symbol, t.hash
            );
        }
    }
}
