use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::heuristic;
use crate::{SymbolCode, ValidationError};

/// Theme assigned to records whose snapshot carried no classification.
pub const UNCLASSIFIED_THEME: &str = "unclassified";

/// One row of the daily streak snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakRecord {
    symbol_code: SymbolCode,
    display_name: String,
    theme_labels: BTreeSet<String>,
    streak_days: u32,
}

impl StreakRecord {
    /// Builds a record; an empty theme set falls back to [`UNCLASSIFIED_THEME`].
    pub fn new<I, S>(
        symbol_code: SymbolCode,
        display_name: impl Into<String>,
        theme_labels: I,
        streak_days: u32,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if streak_days < 1 {
            return Err(ValidationError::StreakDaysBelowOne { value: streak_days });
        }

        let mut theme_labels = theme_labels
            .into_iter()
            .map(|label| {
                let label: String = label.into();
                label.trim().to_owned()
            })
            .filter(|label| !label.is_empty())
            .collect::<BTreeSet<_>>();
        if theme_labels.is_empty() {
            theme_labels.insert(String::from(UNCLASSIFIED_THEME));
        }

        let display_name: String = display_name.into();
        Ok(Self {
            symbol_code,
            display_name: display_name.trim().to_owned(),
            theme_labels,
            streak_days,
        })
    }

    pub fn symbol_code(&self) -> &SymbolCode {
        &self.symbol_code
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn theme_labels(&self) -> &BTreeSet<String> {
        &self.theme_labels
    }

    pub const fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn is_unclassified(&self) -> bool {
        self.theme_labels.len() == 1 && self.theme_labels.contains(UNCLASSIFIED_THEME)
    }
}

/// Outcome of the continuation heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryFlag {
    None,
    Likely,
}

impl ReentryFlag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Likely => "likely",
        }
    }

    pub const fn is_likely(self) -> bool {
        matches!(self, Self::Likely)
    }
}

/// One row of the single-day-streak-exit snapshot.
///
/// `volume_ratio_pct` and `reentry_flag` are derived once at construction and
/// cannot drift from the inputs they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReentryCandidate {
    symbol_code: SymbolCode,
    display_name: String,
    opening_auction_change_pct: Option<f64>,
    today_auction_volume: Option<f64>,
    prior_session_volume: Option<f64>,
    volume_ratio_pct: Option<f64>,
    reentry_flag: ReentryFlag,
}

impl ReentryCandidate {
    pub fn new(
        symbol_code: SymbolCode,
        display_name: impl Into<String>,
        opening_auction_change_pct: Option<f64>,
        today_auction_volume: Option<f64>,
        prior_session_volume: Option<f64>,
    ) -> Self {
        let opening_auction_change_pct = opening_auction_change_pct.filter(|v| v.is_finite());
        let today_auction_volume = today_auction_volume.filter(|v| v.is_finite());
        let prior_session_volume = prior_session_volume.filter(|v| v.is_finite());
        let volume_ratio_pct =
            heuristic::volume_ratio_pct(today_auction_volume, prior_session_volume);
        let reentry_flag = heuristic::evaluate(opening_auction_change_pct, volume_ratio_pct);
        let display_name: String = display_name.into();

        Self {
            symbol_code,
            display_name: display_name.trim().to_owned(),
            opening_auction_change_pct,
            today_auction_volume,
            prior_session_volume,
            volume_ratio_pct,
            reentry_flag,
        }
    }

    pub fn symbol_code(&self) -> &SymbolCode {
        &self.symbol_code
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub const fn opening_auction_change_pct(&self) -> Option<f64> {
        self.opening_auction_change_pct
    }

    pub const fn today_auction_volume(&self) -> Option<f64> {
        self.today_auction_volume
    }

    pub const fn prior_session_volume(&self) -> Option<f64> {
        self.prior_session_volume
    }

    pub const fn volume_ratio_pct(&self) -> Option<f64> {
        self.volume_ratio_pct
    }

    pub const fn reentry_flag(&self) -> ReentryFlag {
        self.reentry_flag
    }
}

/// Display order for candidates: `Likely` first, then by symbol code.
pub fn sort_candidates(candidates: &mut [ReentryCandidate]) {
    candidates.sort_by(|left, right| {
        right
            .reentry_flag
            .cmp(&left.reentry_flag)
            .then_with(|| left.symbol_code.cmp(&right.symbol_code))
    });
}
