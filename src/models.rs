// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normal or internal transaction as returned by the explorer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    #[serde(default)]
    pub block_number: String,
    pub time_stamp: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub is_error: String,     // "0" = success
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub gas: String,
    #[serde(default)]
    pub gas_used: String,
}

/// An ERC-20/721/1155 transfer event as returned by the explorer.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub hash: String,
    #[serde(default)]
    pub block_number: String,
    pub time_stamp: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default)]
    pub token_decimal: String,
    #[serde(default)]
    pub contract_address: String,
}

/// The three record streams, tagged by origin.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Normal(Transaction),
    Internal(Transaction),
    Token(TokenTransfer),
}

impl RawRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            RawRecord::Normal(_) => RecordKind::Normal,
            RawRecord::Internal(_) => RecordKind::Internal,
            RawRecord::Token(_) => RecordKind::Token,
        }
    }

    pub fn from(&self) -> &str {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => &tx.from,
            RawRecord::Token(t) => &t.from,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => &tx.to,
            RawRecord::Token(t) => &t.to,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => &tx.value,
            RawRecord::Token(t) => &t.value,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => &tx.hash,
            RawRecord::Token(t) => &t.hash,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => &tx.time_stamp,
            RawRecord::Token(t) => &t.time_stamp,
        }
    }

    /// `None` for token transfers, which carry no error flag.
    pub fn error_flag(&self) -> Option<&str> {
        match self {
            RawRecord::Normal(tx) | RawRecord::Internal(tx) => Some(&tx.is_error),
            RawRecord::Token(_) => None,
        }
    }

    /// Failed transactions never count; token transfers always do.
    pub fn succeeded(&self) -> bool {
        self.error_flag().map_or(true, |flag| flag == "0")
    }
}

/// Which explorer action a record stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Normal,
    Internal,
    Token,
}

impl RecordKind {
    /// The explorer's `action` query parameter.
    pub fn action(self) -> &'static str {
        match self {
            RecordKind::Normal => "txlist",
            RecordKind::Internal => "txlistinternal",
            RecordKind::Token => "tokentx",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Normal => "normal transactions",
            RecordKind::Internal => "internal transactions",
            RecordKind::Token => "token transfers",
        })
    }
}

/// Which side of the queried address value moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `from == queried`, keyed by `to`
    Outgoing,
    /// `to == queried`, keyed by `from`
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Beneficiary,
    Payer,
}

impl Role {
    pub fn direction(self) -> Direction {
        match self {
            Role::Beneficiary => Direction::Outgoing,
            Role::Payer => Direction::Incoming,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Beneficiary => "beneficiary",
            Role::Payer => "payer",
        })
    }
}

/// One normalized contribution to a counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetail {
    #[serde(rename = "tx_amount")]
    pub amount: f64,
    #[serde(rename = "date_time")]
    pub display_time: String,
    pub transaction_id: String,
}

/// All value moved between the queried address and one counterparty.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterpartyAggregate {
    pub role: Role,
    pub address: String,
    total_amount: f64,
    transactions: Vec<TransactionDetail>,
}

impl CounterpartyAggregate {
    pub fn new(role: Role, address: impl Into<String>, first: TransactionDetail) -> Self {
        Self {
            role,
            address: address.into(),
            total_amount: first.amount,
            transactions: vec![first],
        }
    }

    pub fn push(&mut self, detail: TransactionDetail) {
        self.total_amount += detail.amount;
        self.transactions.push(detail);
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn transactions(&self) -> &[TransactionDetail] {
        &self.transactions
    }
}
