//! Trading-session calendar.
//!
//! Pure date logic: callers pass "today" in, nothing here reads the clock.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{CalendarError, TradeDate};

/// How far back [`previous_session`] searches before giving up.
const PREVIOUS_SESSION_SEARCH_DAYS: u32 = 30;

/// Source of valid trading-session dates.
pub trait TradingCalendar: Send + Sync {
    /// Sessions in `[start, end]`, ascending.
    fn sessions(&self, start: TradeDate, end: TradeDate) -> Result<Vec<TradeDate>, CalendarError>;
}

/// Monday to Friday, minus a configurable holiday set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<TradeDate>,
}

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = TradeDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_session(&self, date: TradeDate) -> bool {
        !date.is_weekend() && !self.holidays.contains(&date)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn sessions(&self, start: TradeDate, end: TradeDate) -> Result<Vec<TradeDate>, CalendarError> {
        if start > end {
            return Err(CalendarError::EmptyRange { start, end });
        }

        let mut sessions = Vec::new();
        let mut cursor = Some(start);
        while let Some(date) = cursor.filter(|date| *date <= end) {
            if self.is_session(date) {
                sessions.push(date);
            }
            cursor = date.next_day();
        }
        Ok(sessions)
    }
}

/// Most recent session in `[today - lookback_days, today]`.
pub fn latest_session(
    calendar: &dyn TradingCalendar,
    today: TradeDate,
    lookback_days: u32,
) -> Result<TradeDate, CalendarError> {
    let start = today
        .checked_sub_days(lookback_days)
        .ok_or(CalendarError::OutOfRange { date: today })?;

    let latest = calendar
        .sessions(start, today)?
        .last()
        .copied()
        .ok_or(CalendarError::NoSession { start, end: today })?;

    debug!(%today, %latest, "selected latest trading session");
    Ok(latest)
}

/// Session immediately before `date`.
pub fn previous_session(
    calendar: &dyn TradingCalendar,
    date: TradeDate,
) -> Result<TradeDate, CalendarError> {
    let end = date
        .previous_day()
        .ok_or(CalendarError::OutOfRange { date })?;
    latest_session(calendar, end, PREVIOUS_SESSION_SEARCH_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> TradeDate {
        TradeDate::parse(value).expect("valid date")
    }

    #[test]
    fn weekends_are_skipped() {
        let sessions = WeekdayCalendar::new()
            .sessions(date("2025-03-14"), date("2025-03-17"))
            .expect("valid range");

        assert_eq!(sessions, vec![date("2025-03-14"), date("2025-03-17")]);
    }

    #[test]
    fn latest_session_on_sunday_is_friday() {
        let latest = latest_session(&WeekdayCalendar::new(), date("2025-03-16"), 30)
            .expect("session exists");

        assert_eq!(latest, date("2025-03-14"));
    }

    #[test]
    fn previous_session_crosses_holidays() {
        let calendar = WeekdayCalendar::with_holidays([date("2025-04-04")]);

        let previous = previous_session(&calendar, date("2025-04-07")).expect("session exists");

        assert_eq!(previous, date("2025-04-03"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = WeekdayCalendar::new()
            .sessions(date("2025-03-17"), date("2025-03-14"))
            .expect_err("must fail");

        assert!(matches!(err, CalendarError::EmptyRange { .. }));
    }

    #[test]
    fn zero_lookback_on_weekend_has_no_session() {
        let err = latest_session(&WeekdayCalendar::new(), date("2025-03-15"), 0)
            .expect_err("must fail");

        assert!(matches!(err, CalendarError::NoSession { .. }));
    }
}
