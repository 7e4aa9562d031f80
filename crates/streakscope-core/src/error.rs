use thiserror::Error;

use crate::normalize::SemanticField;
use crate::TradeDate;

/// Validation and contract errors exposed by `streakscope-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol code cannot be empty")]
    EmptySymbolCode,
    #[error("symbol code length {len} exceeds max {max}")]
    SymbolCodeTooLong { len: usize, max: usize },
    #[error("symbol code contains invalid character '{ch}' at index {index}")]
    SymbolCodeInvalidChar { ch: char, index: usize },

    #[error("streak days must be at least 1, got {value}")]
    StreakDaysBelowOne { value: u32 },

    #[error("trade date must be YYYY-MM-DD or YYYYMMDD: '{value}'")]
    InvalidTradeDate { value: String },

    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },
}

/// A required semantic column could not be resolved from a raw query table.
///
/// Carries every candidate header that was tried together with the headers
/// the table actually had, so the caller can diagnose renamed columns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "no column resolved for '{field}' (tried: [{}]; available: [{}])",
    .tried.join(", "),
    .available.join(", ")
)]
pub struct SchemaError {
    pub field: SemanticField,
    pub tried: Vec<String>,
    pub available: Vec<String>,
}

/// Trading-calendar lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar range is empty: {start} is after {end}")]
    EmptyRange { start: TradeDate, end: TradeDate },
    #[error("no trading session between {start} and {end}")]
    NoSession { start: TradeDate, end: TradeDate },
    #[error("date arithmetic left the supported range near {date}")]
    OutOfRange { date: TradeDate },
    #[error("calendar service unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_tried_and_available_headers() {
        let error = SchemaError {
            field: SemanticField::SymbolCode,
            tried: vec![String::from("= 股票代码"), String::from("= 代码")],
            available: vec![String::from("股票简称"), String::from("最新价")],
        };

        let message = error.to_string();
        assert!(message.contains("symbol_code"));
        assert!(message.contains("= 股票代码, = 代码"));
        assert!(message.contains("股票简称, 最新价"));
    }
}
