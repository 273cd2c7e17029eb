// src/normalize.rs
use chrono::DateTime;
use rust_decimal::prelude::*;
use thiserror::Error;
use tracing::warn;

/// Base units per display unit (wei per ether).
pub const DISPLAY_DECIMALS: u32 = 18;

pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("invalid base-unit amount: {0:?}")]
    InvalidAmount(String),
    #[error("invalid unix timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Convert a base-unit integer string into display units.
pub fn parse_display_amount(value: &str) -> Result<f64, NormalizeError> {
    let digits = value.trim();
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NormalizeError::InvalidAmount(value.to_string()));
    }

    match Decimal::from_str(digits) {
        Ok(mut amount) => {
            amount
                .set_scale(DISPLAY_DECIMALS)
                .map_err(|_| NormalizeError::InvalidAmount(value.to_string()))?;
            amount
                .to_f64()
                .ok_or_else(|| NormalizeError::InvalidAmount(value.to_string()))
        }
        // Wider than Decimal's 96-bit mantissa (large token supplies); f64 keeps the magnitude.
        Err(_) => digits
            .parse::<f64>()
            .map(|v| v / 10f64.powi(DISPLAY_DECIMALS as i32))
            .map_err(|_| NormalizeError::InvalidAmount(value.to_string())),
    }
}

/// Lenient form used by aggregation: malformed amounts count as zero.
pub fn to_display_amount(value: &str) -> f64 {
    parse_display_amount(value).unwrap_or_else(|e| {
        warn!("Treating amount as zero: {}", e);
        0.0
    })
}

pub fn parse_timestamp(epoch_seconds: &str) -> Result<String, NormalizeError> {
    let secs: i64 = epoch_seconds
        .trim()
        .parse()
        .map_err(|_| NormalizeError::InvalidTimestamp(epoch_seconds.to_string()))?;
    let dt = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| NormalizeError::InvalidTimestamp(epoch_seconds.to_string()))?;
    Ok(dt.format(DISPLAY_TIME_FORMAT).to_string())
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` UTC, or hand back the raw string.
pub fn format_timestamp(epoch_seconds: &str) -> String {
    parse_timestamp(epoch_seconds).unwrap_or_else(|_| epoch_seconds.to_string())
}
