//! Retry policy for collaborator transports.
//!
//! Pipeline stages never retry; only HTTP adapters wrap their calls in
//! [`execute_with_retry`].

use std::time::Duration;

use tracing::warn;

use crate::http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse};

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally with +/- 50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds.max(0.0));

                if !jitter {
                    return delay;
                }

                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread.saturating_mul(2));
                Duration::from_millis((millis + offset).saturating_sub(spread))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_on_status: Vec<u16>,
    pub retry_on_timeout: bool,
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn should_retry_error(&self, error: &HttpError) -> bool {
        if !error.retryable() {
            return false;
        }
        match error.kind() {
            HttpErrorKind::Timeout => self.retry_on_timeout,
            HttpErrorKind::Connect => self.retry_on_connect,
            HttpErrorKind::Other => true,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    const fn attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }
}

/// Executes `request`, retrying transport errors and retryable statuses.
///
/// The last response is returned as-is once attempts run out, so callers
/// still see the final status code.
pub async fn execute_with_retry(
    client: &dyn HttpClient,
    request: HttpRequest,
    config: &RetryConfig,
) -> Result<HttpResponse, HttpError> {
    let attempts = config.attempts();
    let mut attempt = 0;

    loop {
        let is_last = attempt + 1 >= attempts;
        match client.execute(request.clone()).await {
            Ok(response) if !is_last && config.should_retry_status(response.status) => {
                warn!(
                    url = %request.url,
                    status = response.status,
                    attempt,
                    "retryable status from upstream"
                );
            }
            Ok(response) => return Ok(response),
            Err(error) if !is_last && config.should_retry_error(&error) => {
                warn!(url = %request.url, %error, attempt, "transport error; retrying");
            }
            Err(error) => return Err(error),
        }

        tokio::time::sleep(config.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            *self.calls.lock().expect("lock") += 1;
            let next = self
                .responses
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or_else(|| Err(HttpError::non_retryable("script exhausted")));
            Box::pin(async move { next })
        }
    }

    fn immediate(max_retries: u32) -> RetryConfig {
        RetryConfig::fixed(Duration::ZERO, max_retries)
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(7), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_caps_at_max() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_of_delay() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 1.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..20 {
            let millis = backoff.delay(0).as_millis();
            assert!((100..=300).contains(&millis), "delay_ms={millis}");
        }
    }

    #[test]
    fn non_retryable_errors_are_not_retried() {
        let config = RetryConfig::default();
        assert!(!config.should_retry_error(&HttpError::non_retryable("bad url")));
        assert!(config.should_retry_error(&HttpError::timeout("slow")));

        let no_timeouts = RetryConfig {
            retry_on_timeout: false,
            ..RetryConfig::default()
        };
        assert!(!no_timeouts.should_retry_error(&HttpError::timeout("slow")));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let client = ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(503, "")),
            Err(HttpError::connect("refused")),
            Ok(HttpResponse::ok_json("{\"ok\":true}")),
        ]);

        let response = execute_with_retry(&client, HttpRequest::get("http://q"), &immediate(3))
            .await
            .expect("eventually succeeds");

        assert_eq!(response.status, 200);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn returns_last_status_when_attempts_run_out() {
        let client = ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(429, "")),
            Ok(HttpResponse::with_status(429, "")),
        ]);

        let response = execute_with_retry(&client, HttpRequest::get("http://q"), &immediate(1))
            .await
            .expect("transport succeeded");

        assert_eq!(response.status, 429);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_retry_makes_a_single_attempt() {
        let client = ScriptedClient::new(vec![Err(HttpError::timeout("slow"))]);

        let err = execute_with_retry(&client, HttpRequest::get("http://q"), &RetryConfig::no_retry())
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), HttpErrorKind::Timeout);
        assert_eq!(client.calls(), 1);
    }
}
