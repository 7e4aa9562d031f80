//! # Domain Models
//!
//! Canonical record types produced by normalization and consumed by the
//! classifier, the continuation heuristic and the report assembler.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StreakRecord`] | One stock on a consecutive up-limit streak |
//! | [`ReentryCandidate`] | One stock that just exited a single-day streak |
//! | [`ReentryFlag`] | Heuristic verdict for a candidate |
//! | [`SymbolCode`] | Validated exchange security code |
//! | [`TradeDate`] | Trading session date (`YYYY-MM-DD` / `YYYYMMDD`) |
//! | [`Timestamp`] | RFC3339 instant, usually at exchange time (UTC+8) |
//!
//! All types validate their invariants at construction and expose read-only
//! accessors; nothing is mutated after normalization.

mod models;
mod symbol;
mod timestamp;
mod trade_date;

pub use models::{
    sort_candidates, ReentryCandidate, ReentryFlag, StreakRecord, UNCLASSIFIED_THEME,
};
pub use symbol::SymbolCode;
pub use timestamp::{Timestamp, EXCHANGE_OFFSET};
pub use trade_date::TradeDate;
