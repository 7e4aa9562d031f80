use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Duration, Month, Weekday};

use crate::ValidationError;

/// Calendar date of a trading session.
///
/// Accepts both `YYYY-MM-DD` (calendar service form) and `YYYYMMDD` (the form
/// the query service embeds in date-qualified headers). Displays and
/// serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradeDate(Date);

impl TradeDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidTradeDate {
            value: input.to_owned(),
        };

        let (year, month, day) = if trimmed.len() == 8 && trimmed.chars().all(|ch| ch.is_ascii_digit())
        {
            (&trimmed[0..4], &trimmed[4..6], &trimmed[6..8])
        } else {
            let mut parts = trimmed.split('-');
            let parsed = (parts.next(), parts.next(), parts.next(), parts.next());
            match parsed {
                (Some(year), Some(month), Some(day), None)
                    if year.len() == 4 && month.len() == 2 && day.len() == 2 =>
                {
                    (year, month, day)
                }
                _ => return Err(invalid()),
            }
        };

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;

        Ok(Self(date))
    }

    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    /// `YYYYMMDD`, the form embedded in query text and column headers.
    pub fn compact(self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    /// `YYYY-MM-DD`.
    pub fn iso(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    pub fn previous_day(self) -> Option<Self> {
        self.0.previous_day().map(Self)
    }

    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    pub fn checked_sub_days(self, days: u32) -> Option<Self> {
        self.0
            .checked_sub(Duration::days(i64::from(days)))
            .map(Self)
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn is_weekend(self) -> bool {
        matches!(self.weekday(), Weekday::Saturday | Weekday::Sunday)
    }
}

impl Display for TradeDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso())
    }
}

impl FromStr for TradeDate {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for TradeDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.iso())
    }
}

impl<'de> Deserialize<'de> for TradeDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_and_iso_forms_to_same_date() {
        let compact = TradeDate::parse("20250314").expect("compact must parse");
        let iso = TradeDate::parse("2025-03-14").expect("iso must parse");

        assert_eq!(compact, iso);
        assert_eq!(compact.compact(), "20250314");
        assert_eq!(iso.to_string(), "2025-03-14");
    }

    #[test]
    fn rejects_impossible_dates() {
        let err = TradeDate::parse("20250230").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTradeDate { .. }));
    }

    #[test]
    fn rejects_other_separators() {
        assert!(TradeDate::parse("2025/03/14").is_err());
        assert!(TradeDate::parse("2025-3-14").is_err());
    }

    #[test]
    fn serializes_as_iso_string() {
        let date = TradeDate::parse("20250102").expect("must parse");
        let json = serde_json::to_string(&date).expect("serialize");
        assert_eq!(json, "\"2025-01-02\"");
    }
}
