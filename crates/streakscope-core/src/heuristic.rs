//! Continuation heuristic for single-day-streak exits.
//!
//! A candidate is flagged [`ReentryFlag::Likely`] when its opening auction
//! change falls in one of two bands and the auction volume, relative to the
//! prior session's full volume, clears that band's threshold.
//!
//! | Band (change %) | Volume ratio % |
//! |-----------------|----------------|
//! | `[-10, -5)` | `> 5` |
//! | `[-5, 0)` | `> 2.5` |
//!
//! Rules are evaluated in order and the first match wins. Missing inputs never
//! produce a positive signal.

use serde::Serialize;

use crate::{ReentryCandidate, ReentryFlag};

/// One row of the rule table: lower bound inclusive, upper bound exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReentryRule {
    pub change_from_pct: f64,
    pub change_to_pct: f64,
    pub min_volume_ratio_pct: f64,
}

impl ReentryRule {
    pub fn matches(&self, opening_auction_change_pct: f64, volume_ratio_pct: f64) -> bool {
        opening_auction_change_pct >= self.change_from_pct
            && opening_auction_change_pct < self.change_to_pct
            && volume_ratio_pct > self.min_volume_ratio_pct
    }
}

pub const REENTRY_RULES: [ReentryRule; 2] = [
    ReentryRule {
        change_from_pct: -10.0,
        change_to_pct: -5.0,
        min_volume_ratio_pct: 5.0,
    },
    ReentryRule {
        change_from_pct: -5.0,
        change_to_pct: 0.0,
        min_volume_ratio_pct: 2.5,
    },
];

/// `today_auction_volume / prior_session_volume * 100`, absent when either
/// input is absent or the denominator is zero.
pub fn volume_ratio_pct(
    today_auction_volume: Option<f64>,
    prior_session_volume: Option<f64>,
) -> Option<f64> {
    let today = today_auction_volume?;
    let prior = prior_session_volume?;
    if prior == 0.0 {
        return None;
    }

    let ratio = today / prior * 100.0;
    ratio.is_finite().then_some(ratio)
}

/// Applies the rule table to raw inputs.
pub fn evaluate(
    opening_auction_change_pct: Option<f64>,
    volume_ratio_pct: Option<f64>,
) -> ReentryFlag {
    let (Some(change), Some(ratio)) = (opening_auction_change_pct, volume_ratio_pct) else {
        return ReentryFlag::None;
    };

    if REENTRY_RULES.iter().any(|rule| rule.matches(change, ratio)) {
        ReentryFlag::Likely
    } else {
        ReentryFlag::None
    }
}

/// Scores a normalized candidate.
pub fn score(candidate: &ReentryCandidate) -> ReentryFlag {
    evaluate(
        candidate.opening_auction_change_pct(),
        candidate.volume_ratio_pct(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_gap_down_with_strong_auction_is_likely() {
        assert_eq!(evaluate(Some(-7.0), Some(6.0)), ReentryFlag::Likely);
    }

    #[test]
    fn minus_five_belongs_to_the_shallow_band() {
        assert_eq!(evaluate(Some(-5.0), Some(6.0)), ReentryFlag::Likely);
        assert_eq!(evaluate(Some(-5.0), Some(2.6)), ReentryFlag::Likely);
        assert_eq!(evaluate(Some(-5.0), Some(2.5)), ReentryFlag::None);
    }

    #[test]
    fn minus_ten_is_inclusive_and_below_it_is_not() {
        assert_eq!(evaluate(Some(-10.0), Some(6.0)), ReentryFlag::Likely);
        assert_eq!(evaluate(Some(-10.01), Some(50.0)), ReentryFlag::None);
    }

    #[test]
    fn zero_change_is_excluded() {
        assert_eq!(evaluate(Some(0.0), Some(50.0)), ReentryFlag::None);
    }

    #[test]
    fn ratio_below_band_threshold_is_none() {
        assert_eq!(evaluate(Some(-3.0), Some(2.0)), ReentryFlag::None);
        assert_eq!(evaluate(Some(-7.0), Some(5.0)), ReentryFlag::None);
    }

    #[test]
    fn missing_inputs_never_signal() {
        assert_eq!(evaluate(None, Some(50.0)), ReentryFlag::None);
        assert_eq!(evaluate(Some(-7.0), None), ReentryFlag::None);
        assert_eq!(evaluate(None, None), ReentryFlag::None);
    }

    #[test]
    fn ratio_is_absent_for_zero_or_missing_denominator() {
        assert_eq!(volume_ratio_pct(Some(10.0), Some(0.0)), None);
        assert_eq!(volume_ratio_pct(Some(10.0), None), None);
        assert_eq!(volume_ratio_pct(None, Some(10.0)), None);
        assert_eq!(volume_ratio_pct(Some(50.0), Some(1000.0)), Some(5.0));
    }
}
