use std::collections::HashMap;

use crate::models::{CounterpartyAggregate, Direction, RawRecord, Role, TransactionDetail};
use crate::normalize::{format_timestamp, to_display_amount};

/// Group `records` by counterparty for `queried_address`.
///
/// Records are scanned in the order given (normal, then internal, then token
/// transfers when built by the analyzer). A record contributes when it
/// succeeded and its endpoint on the queried side matches case-insensitively;
/// the other endpoint, exactly as written, becomes the aggregate key. Output
/// preserves first-seen order of counterparties.
pub fn aggregate(
    queried_address: &str,
    records: &[RawRecord],
    direction: Direction,
) -> Vec<CounterpartyAggregate> {
    let role = match direction {
        Direction::Outgoing => Role::Beneficiary,
        Direction::Incoming => Role::Payer,
    };

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut aggregates: Vec<CounterpartyAggregate> = Vec::new();

    for record in records {
        if !record.succeeded() {
            continue;
        }

        let (own_side, counterparty) = match direction {
            Direction::Outgoing => (record.from(), record.to()),
            Direction::Incoming => (record.to(), record.from()),
        };
        if !own_side.eq_ignore_ascii_case(queried_address) {
            continue;
        }

        let detail = TransactionDetail {
            amount: to_display_amount(record.value()),
            display_time: format_timestamp(record.timestamp()),
            transaction_id: record.hash().to_string(),
        };

        match index.get(counterparty) {
            Some(&slot) => aggregates[slot].push(detail),
            None => {
                index.insert(counterparty, aggregates.len());
                aggregates.push(CounterpartyAggregate::new(role, counterparty, detail));
            }
        }
    }

    aggregates
}
