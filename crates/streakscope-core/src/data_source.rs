use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::{RawTable, TradeDate};

/// Query template for the daily streak snapshot. `{date}` is `YYYYMMDD`.
pub const DEFAULT_STREAK_QUERY: &str = "非ST，{date}连续涨停天数排序,概念";

/// Query for main-board stocks that hit the limit two sessions ago and
/// missed it on the prior session, with today's auction figures.
pub const DEFAULT_REENTRY_QUERY: &str =
    "沪深主板，非st，前日涨停，昨日未涨停，今日竞价涨幅，今日竞价量，昨日成交量";

/// Collaborator error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    InvalidResponse,
    Internal,
}

/// Structured error returned by external collaborators (query and narrative services).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a non-success HTTP status onto an error kind.
    pub fn from_status(service: &str, status: u16) -> Self {
        let message = format!("{service} returned status {status}");
        match status {
            429 => Self::rate_limited(message),
            408 | 500..=599 => Self::unavailable(message),
            _ => Self::invalid_request(message),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Free-text request to the market query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub requested_date: TradeDate,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, requested_date: TradeDate) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::invalid_request("query text must not be empty"));
        }
        Ok(Self {
            query,
            requested_date,
        })
    }

    /// Substitutes `{date}` in `template` with the compact requested date.
    pub fn from_template(template: &str, requested_date: TradeDate) -> Result<Self, SourceError> {
        Self::new(
            template.replace("{date}", &requested_date.compact()),
            requested_date,
        )
    }
}

/// Market query service contract.
///
/// `Ok(None)` means the service had no data for the query; callers treat it
/// like an empty table, never as an error.
pub trait QueryService: Send + Sync {
    fn name(&self) -> &'static str;

    fn query<'a>(
        &'a self,
        request: QueryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RawTable>, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_embeds_compact_date() {
        let date = TradeDate::parse("2025-03-14").expect("valid date");
        let request = QueryRequest::from_template(DEFAULT_STREAK_QUERY, date).expect("valid query");

        assert_eq!(request.query, "非ST，20250314连续涨停天数排序,概念");
    }

    #[test]
    fn blank_query_is_rejected() {
        let date = TradeDate::parse("2025-03-14").expect("valid date");
        let err = QueryRequest::new("  ", date).expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert!(!err.retryable());
    }

    #[test]
    fn status_mapping_marks_throttling_retryable() {
        let throttled = SourceError::from_status("query service", 429);
        assert_eq!(throttled.kind(), SourceErrorKind::RateLimited);
        assert!(throttled.retryable());

        let upstream = SourceError::from_status("query service", 503);
        assert_eq!(upstream.code(), "source.unavailable");

        let rejected = SourceError::from_status("query service", 403);
        assert_eq!(rejected.kind(), SourceErrorKind::InvalidRequest);
    }
}
