use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::data_source::{QueryRequest, QueryService, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient};
use crate::retry::{execute_with_retry, RetryConfig};
use crate::RawTable;

pub const QUERY_ENDPOINT_ENV: &str = "STREAKSCOPE_QUERY_ENDPOINT";
pub const QUERY_COOKIE_ENV: &str = "STREAKSCOPE_QUERY_COOKIE";

/// Connection settings for [`HttpQueryService`].
#[derive(Clone, PartialEq)]
pub struct QueryServiceConfig {
    pub endpoint: String,
    pub cookie: Option<String>,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl QueryServiceConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cookie: None,
            timeout_ms: 15_000,
            retry: RetryConfig::default(),
        }
    }

    /// Reads the endpoint and optional session cookie from the environment.
    pub fn from_env() -> Result<Self, SourceError> {
        let endpoint = std::env::var(QUERY_ENDPOINT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                SourceError::invalid_request(format!("{QUERY_ENDPOINT_ENV} is not set"))
            })?;
        let cookie = std::env::var(QUERY_COOKIE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            cookie,
            ..Self::new(endpoint)
        })
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for QueryServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Market query service reached over HTTP.
///
/// Sends `GET {endpoint}?query=<text>` and accepts any of these bodies:
/// `{"columns": [...], "rows": [[...]]}`, an array of row objects, or either
/// of those wrapped in `{"data": ...}`. `null`, `{}` and `[]` mean no data.
#[derive(Clone)]
pub struct HttpQueryService {
    http_client: Arc<dyn HttpClient>,
    config: QueryServiceConfig,
}

impl HttpQueryService {
    pub fn new(http_client: Arc<dyn HttpClient>, config: QueryServiceConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn offline(config: QueryServiceConfig) -> Self {
        Self::new(Arc::new(NoopHttpClient), config)
    }

    fn build_request(&self, request: &QueryRequest) -> HttpRequest {
        let separator = if self.config.endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        let url = format!(
            "{}{separator}query={}",
            self.config.endpoint,
            urlencoding::encode(&request.query)
        );

        let auth = self
            .config
            .cookie
            .as_ref()
            .map_or(HttpAuth::None, |cookie| HttpAuth::Cookie(cookie.clone()));

        HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&auth)
            .with_timeout_ms(self.config.timeout_ms)
    }
}

impl QueryService for HttpQueryService {
    fn name(&self) -> &'static str {
        "http"
    }

    fn query<'a>(
        &'a self,
        request: QueryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RawTable>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let http_request = self.build_request(&request);
            debug!(date = %request.requested_date, query = %request.query, "querying market service");

            let response =
                execute_with_retry(self.http_client.as_ref(), http_request, &self.config.retry)
                    .await
                    .map_err(|error| {
                        if error.retryable() {
                            SourceError::unavailable(format!(
                                "query service transport error: {}",
                                error.message()
                            ))
                        } else {
                            SourceError::internal(format!(
                                "query service transport error: {}",
                                error.message()
                            ))
                        }
                    })?;

            if !response.is_success() {
                return Err(SourceError::from_status("query service", response.status));
            }

            let table = parse_table_body(&response.body)?;
            info!(
                date = %request.requested_date,
                rows = table.as_ref().map_or(0, RawTable::row_count),
                "query service responded"
            );
            Ok(table)
        })
    }
}

/// Decodes a query-service response body into a [`RawTable`].
pub fn parse_table_body(body: &str) -> Result<Option<RawTable>, SourceError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body).map_err(|error| {
        SourceError::invalid_response(format!("query service returned invalid JSON: {error}"))
    })?;
    table_from_value(value)
}

fn table_from_value(value: Value) -> Result<Option<RawTable>, SourceError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        Value::Array(items) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(SourceError::invalid_response(format!(
                        "expected row object, found {}",
                        json_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(RawTable::from_records(&records)))
        }
        Value::Object(mut map) => {
            if map.is_empty() {
                return Ok(None);
            }
            if let Some(data) = map.remove("data") {
                return table_from_value(data);
            }
            if map.contains_key("columns") {
                let table: RawTable = serde_json::from_value(Value::Object(map)).map_err(|error| {
                    SourceError::invalid_response(format!("malformed column table: {error}"))
                })?;
                return Ok((!table.columns().is_empty()).then_some(table));
            }
            Err(SourceError::invalid_response(
                "object body has neither 'data' nor 'columns'",
            ))
        }
        other => Err(SourceError::invalid_response(format!(
            "expected table body, found {}",
            json_kind(&other)
        ))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::TradeDate;

    struct RecordingClient {
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl HttpClient for RecordingClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.seen.lock().expect("lock").push(request);
            let response = self.response.clone();
            Box::pin(async move { Ok(response) })
        }
    }

    fn request() -> QueryRequest {
        QueryRequest::new("非ST，20250314连续涨停天数排序,概念", TradeDate::parse("20250314").expect("date"))
            .expect("valid request")
    }

    #[test]
    fn parses_column_table_body() {
        let table = parse_table_body(r#"{"columns":["股票代码"],"rows":[["600000"]]}"#)
            .expect("valid body")
            .expect("has data");

        assert_eq!(table.columns(), ["股票代码"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn parses_wrapped_record_array() {
        let table = parse_table_body(r#"{"data":[{"股票代码":"600000"},{"股票代码":"000001"}]}"#)
            .expect("valid body")
            .expect("has data");

        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn record_array_keeps_body_header_order() {
        let table = parse_table_body(r#"[{"股票简称":"甲","股票代码":"600001","连板":2}]"#)
            .expect("valid body")
            .expect("has data");

        assert_eq!(table.columns(), ["股票简称", "股票代码", "连板"]);
    }

    #[test]
    fn empty_bodies_mean_no_data() {
        for body in ["", "null", "[]", "{}", r#"{"data":null}"#] {
            assert_eq!(parse_table_body(body).expect("valid body"), None, "body={body}");
        }
    }

    #[test]
    fn scalar_body_is_invalid_response() {
        let err = parse_table_body("42").expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn sends_encoded_query_with_cookie() {
        let client = Arc::new(RecordingClient {
            response: HttpResponse::ok_json("[]"),
            seen: Mutex::new(Vec::new()),
        });
        let service = HttpQueryService::new(
            client.clone(),
            QueryServiceConfig::new("https://query.example.test/api").with_cookie("v=1"),
        );

        let table = service.query(request()).await.expect("query succeeds");

        assert_eq!(table, None);
        let seen = client.seen.lock().expect("lock");
        assert!(seen[0].url.starts_with("https://query.example.test/api?query=%E9%9D%9E"));
        assert_eq!(seen[0].headers.get("cookie").map(String::as_str), Some("v=1"));
    }

    #[tokio::test]
    async fn client_error_status_is_not_retried() {
        let client = Arc::new(RecordingClient {
            response: HttpResponse::with_status(403, "forbidden"),
            seen: Mutex::new(Vec::new()),
        });
        let service = HttpQueryService::new(
            client.clone(),
            QueryServiceConfig::new("https://query.example.test/api"),
        );

        let err = service.query(request()).await.expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(client.seen.lock().expect("lock").len(), 1);
    }
}
