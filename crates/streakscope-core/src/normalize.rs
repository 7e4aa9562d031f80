//! Schema normalization for raw query tables.
//!
//! The query service names its columns after the phrasing of the query, and
//! some headers carry the requested session as a `[YYYYMMDD]` suffix. Each
//! semantic field therefore has an ordered list of [`HeaderCandidate`]s; the
//! first candidate that matches any header wins, and within one candidate the
//! left-most matching header wins.
//!
//! | Field | Candidates (in order) | Missing column |
//! |-------|-----------------------|----------------|
//! | symbol code | `股票代码`, `代码` | [`SchemaError`] |
//! | display name | `股票简称`, `名称` | [`SchemaError`] |
//! | theme labels | `所属概念`, `概念`, `概念名称` | every record gets [`UNCLASSIFIED_THEME`](crate::UNCLASSIFIED_THEME) |
//! | streak days | `连续涨停天数[date]`, `*连续涨停天数*`, `*连板*` | [`SchemaError`] |
//!
//! Re-entry numeric fields fall back to fragment matches only for headers
//! that are unqualified or qualified with the same session.
//!
//! Rows whose streak count is missing, non-numeric, fractional or below one
//! are dropped. Normalization never mutates the input table.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{ReentryCandidate, RawTable, SchemaError, StreakRecord, SymbolCode, TradeDate};

pub const SYMBOL_CODE_HEADERS: [&str; 2] = ["股票代码", "代码"];
pub const DISPLAY_NAME_HEADERS: [&str; 2] = ["股票简称", "名称"];
pub const THEME_LABEL_HEADERS: [&str; 3] = ["所属概念", "概念", "概念名称"];

const STREAK_DAYS_HEADER: &str = "连续涨停天数";
const STREAK_BOARD_FRAGMENT: &str = "连板";
const OPENING_AUCTION_CHANGE_HEADER: &str = "竞价涨幅";
const AUCTION_VOLUME_HEADER: &str = "竞价量";
const SESSION_VOLUME_HEADER: &str = "成交量";

static NULL_CELL: Value = Value::Null;

/// Semantic field of a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    SymbolCode,
    DisplayName,
    ThemeLabels,
    StreakDays,
    OpeningAuctionChange,
    TodayAuctionVolume,
    PriorSessionVolume,
}

impl SemanticField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SymbolCode => "symbol_code",
            Self::DisplayName => "display_name",
            Self::ThemeLabels => "theme_labels",
            Self::StreakDays => "streak_days",
            Self::OpeningAuctionChange => "opening_auction_change_pct",
            Self::TodayAuctionVolume => "today_auction_volume",
            Self::PriorSessionVolume => "prior_session_volume",
        }
    }
}

impl Display for SemanticField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One acceptable header for a semantic field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCandidate {
    Exact(String),
    Containing(String),
    /// Fragment match that rejects headers qualified with another session.
    ContainingOn { fragment: String, session: TradeDate },
}

impl HeaderCandidate {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            Self::Exact(name) => header.trim() == name,
            Self::Containing(fragment) => header.contains(fragment.as_str()),
            Self::ContainingOn { fragment, session } => {
                header.contains(fragment.as_str())
                    && header_qualifier(header)
                        .is_none_or(|qualifier| qualifier == session.compact())
            }
        }
    }
}

/// Contents of a trailing `[...]` qualifier.
fn header_qualifier(header: &str) -> Option<&str> {
    let inner = header.trim().strip_suffix(']')?;
    let open = inner.rfind('[')?;
    Some(&inner[open + 1..])
}

impl Display for HeaderCandidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "= {name}"),
            Self::Containing(fragment) => write!(f, "~ {fragment}"),
            Self::ContainingOn { fragment, session } => {
                write!(f, "~ {fragment} @ {}", session.compact())
            }
        }
    }
}

/// Ordered resolution table for one semantic field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolver {
    field: SemanticField,
    candidates: Vec<HeaderCandidate>,
}

impl ColumnResolver {
    pub fn new(field: SemanticField) -> Self {
        Self {
            field,
            candidates: Vec::new(),
        }
    }

    pub fn exact(mut self, name: impl Into<String>) -> Self {
        self.candidates.push(HeaderCandidate::Exact(name.into()));
        self
    }

    pub fn exact_any<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.candidates
            .extend(names.into_iter().map(|name| HeaderCandidate::Exact(name.to_owned())));
        self
    }

    pub fn containing(mut self, fragment: impl Into<String>) -> Self {
        self.candidates
            .push(HeaderCandidate::Containing(fragment.into()));
        self
    }

    pub fn containing_on(mut self, fragment: impl Into<String>, session: TradeDate) -> Self {
        self.candidates.push(HeaderCandidate::ContainingOn {
            fragment: fragment.into(),
            session,
        });
        self
    }

    pub const fn field(&self) -> SemanticField {
        self.field
    }

    pub fn candidates(&self) -> &[HeaderCandidate] {
        &self.candidates
    }

    /// Index of the resolved column, if any candidate matches.
    pub fn resolve(&self, columns: &[String]) -> Option<usize> {
        for candidate in &self.candidates {
            if let Some(index) = columns.iter().position(|column| candidate.matches(column)) {
                debug!(
                    field = %self.field,
                    candidate = %candidate,
                    column = %columns[index],
                    "resolved column"
                );
                return Some(index);
            }
        }
        None
    }

    pub fn require(&self, columns: &[String]) -> Result<usize, SchemaError> {
        self.resolve(columns).ok_or_else(|| SchemaError {
            field: self.field,
            tried: self.candidates.iter().map(ToString::to_string).collect(),
            available: columns.to_vec(),
        })
    }
}

fn symbol_code_resolver() -> ColumnResolver {
    ColumnResolver::new(SemanticField::SymbolCode).exact_any(SYMBOL_CODE_HEADERS)
}

fn display_name_resolver() -> ColumnResolver {
    ColumnResolver::new(SemanticField::DisplayName).exact_any(DISPLAY_NAME_HEADERS)
}

fn date_qualified(name: &str, date: TradeDate) -> String {
    format!("{name}[{}]", date.compact())
}

/// Resolution table for the daily streak snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakSchema {
    pub symbol_code: ColumnResolver,
    pub display_name: ColumnResolver,
    pub theme_labels: ColumnResolver,
    pub streak_days: ColumnResolver,
}

impl StreakSchema {
    pub fn for_date(requested_date: TradeDate) -> Self {
        Self {
            symbol_code: symbol_code_resolver(),
            display_name: display_name_resolver(),
            theme_labels: ColumnResolver::new(SemanticField::ThemeLabels)
                .exact_any(THEME_LABEL_HEADERS),
            streak_days: ColumnResolver::new(SemanticField::StreakDays)
                .exact(date_qualified(STREAK_DAYS_HEADER, requested_date))
                .containing(STREAK_DAYS_HEADER)
                .containing(STREAK_BOARD_FRAGMENT),
        }
    }

    pub fn normalize(&self, table: &RawTable) -> Result<Vec<StreakRecord>, SchemaError> {
        if table.is_empty() {
            debug!("streak snapshot has no rows");
            return Ok(Vec::new());
        }

        let columns = table.columns();
        let code_index = self.symbol_code.require(columns)?;
        let name_index = self.display_name.require(columns)?;
        let streak_index = self.streak_days.require(columns)?;
        let theme_index = self.theme_labels.resolve(columns);
        if theme_index.is_none() {
            warn!(
                available = ?columns,
                "no theme column resolved; assigning every record to the unclassified theme"
            );
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(table.row_count());
        let mut dropped = 0_usize;

        for (row_index, row) in table.rows().iter().enumerate() {
            let cell = |index: usize| row.get(index).unwrap_or(&NULL_CELL);

            let Some(streak_days) = cell_streak_days(cell(streak_index)) else {
                dropped += 1;
                continue;
            };
            let Some(symbol_code) = cell_symbol_code(cell(code_index)) else {
                warn!(row = row_index, "dropping row with unusable symbol code");
                dropped += 1;
                continue;
            };
            if !seen.insert(symbol_code.clone()) {
                warn!(row = row_index, symbol = %symbol_code, "duplicate symbol code; keeping first row");
                dropped += 1;
                continue;
            }

            let display_name = cell_text(cell(name_index)).unwrap_or_default();
            let theme_labels = theme_index
                .and_then(|index| cell_text(cell(index)))
                .map(|raw| split_theme_labels(&raw))
                .unwrap_or_default();

            match StreakRecord::new(symbol_code, display_name, theme_labels, streak_days) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(row = row_index, %error, "dropping invalid streak row");
                    dropped += 1;
                }
            }
        }

        info!(
            records = records.len(),
            dropped,
            "normalized streak snapshot"
        );
        Ok(records)
    }
}

/// Resolution table for the single-day-streak-exit snapshot.
///
/// The auction columns are qualified with the requested session and the
/// full-session volume with the prior session; unresolved numeric columns
/// leave the field absent on every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReentrySchema {
    pub symbol_code: ColumnResolver,
    pub display_name: ColumnResolver,
    pub opening_auction_change: ColumnResolver,
    pub today_auction_volume: ColumnResolver,
    pub prior_session_volume: ColumnResolver,
}

impl ReentrySchema {
    pub fn for_sessions(requested_date: TradeDate, prior_session: TradeDate) -> Self {
        Self {
            symbol_code: symbol_code_resolver(),
            display_name: display_name_resolver(),
            opening_auction_change: ColumnResolver::new(SemanticField::OpeningAuctionChange)
                .exact(date_qualified(OPENING_AUCTION_CHANGE_HEADER, requested_date))
                .containing_on(OPENING_AUCTION_CHANGE_HEADER, requested_date),
            today_auction_volume: ColumnResolver::new(SemanticField::TodayAuctionVolume)
                .exact(date_qualified(AUCTION_VOLUME_HEADER, requested_date))
                .containing_on(AUCTION_VOLUME_HEADER, requested_date),
            prior_session_volume: ColumnResolver::new(SemanticField::PriorSessionVolume)
                .exact(date_qualified(SESSION_VOLUME_HEADER, prior_session))
                .containing_on(SESSION_VOLUME_HEADER, prior_session),
        }
    }

    pub fn normalize(&self, table: &RawTable) -> Result<Vec<ReentryCandidate>, SchemaError> {
        if table.is_empty() {
            debug!("re-entry snapshot has no rows");
            return Ok(Vec::new());
        }

        let columns = table.columns();
        let code_index = self.symbol_code.require(columns)?;
        let name_index = self.display_name.require(columns)?;
        let change_index = self.opening_auction_change.resolve(columns);
        let auction_index = self.today_auction_volume.resolve(columns);
        let prior_index = self.prior_session_volume.resolve(columns);

        for (resolver, index) in [
            (&self.opening_auction_change, change_index),
            (&self.today_auction_volume, auction_index),
            (&self.prior_session_volume, prior_index),
        ] {
            if index.is_none() {
                warn!(field = %resolver.field(), "column not resolved; field absent for all candidates");
            }
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(table.row_count());

        for (row_index, row) in table.rows().iter().enumerate() {
            let cell = |index: usize| row.get(index).unwrap_or(&NULL_CELL);
            let number = |index: Option<usize>| index.and_then(|index| cell_number(cell(index)));

            let Some(symbol_code) = cell_symbol_code(cell(code_index)) else {
                warn!(row = row_index, "dropping row with unusable symbol code");
                continue;
            };
            if !seen.insert(symbol_code.clone()) {
                warn!(row = row_index, symbol = %symbol_code, "duplicate symbol code; keeping first row");
                continue;
            }

            candidates.push(ReentryCandidate::new(
                symbol_code,
                cell_text(cell(name_index)).unwrap_or_default(),
                number(change_index),
                number(auction_index),
                number(prior_index),
            ));
        }

        info!(candidates = candidates.len(), "normalized re-entry snapshot");
        Ok(candidates)
    }
}

/// Maps a raw streak snapshot onto [`StreakRecord`]s.
pub fn normalize(
    table: &RawTable,
    requested_date: TradeDate,
) -> Result<Vec<StreakRecord>, SchemaError> {
    StreakSchema::for_date(requested_date).normalize(table)
}

/// Maps a raw single-day-exit snapshot onto [`ReentryCandidate`]s.
pub fn normalize_reentry(
    table: &RawTable,
    requested_date: TradeDate,
    prior_session: TradeDate,
) -> Result<Vec<ReentryCandidate>, SchemaError> {
    ReentrySchema::for_sessions(requested_date, prior_session).normalize(table)
}

/// Text content of a cell; arrays are joined with `;` like a multi-label cell.
pub fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(cell_text)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Null | Value::Bool(_) | Value::Object(_) => return None,
    };

    (!text.is_empty()).then_some(text)
}

/// Numeric coercion; anything that is not a finite number becomes absent.
pub fn cell_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}

fn cell_streak_days(value: &Value) -> Option<u32> {
    let number = cell_number(value)?;
    if number.fract() != 0.0 || number < 1.0 || number > f64::from(u32::MAX) {
        return None;
    }
    Some(number as u32)
}

fn cell_symbol_code(value: &Value) -> Option<SymbolCode> {
    cell_text(value).and_then(|raw| SymbolCode::parse(&raw).ok())
}

/// Splits a multi-label theme cell on `;` / `；`, trimming and dropping empties.
pub fn split_theme_labels(raw: &str) -> Vec<String> {
    raw.split([';', '；'])
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect()
}
