// ============================================
// File: crates/ooband-transport/src/http.rs
// ============================================
//! # Retrying HTTP Client
//!
//! ## Creation Reason
//! Register and deregister are awaited network calls; a dropped packet
//! or a restarting server must not turn into a failed session. This
//! client retries transient failures with exponential backoff.
//!
//! ## Retry Policy
//! ```text
//! attempt 0 ──► ok/4xx ──► return
//!     │
//!     └─ connect error / timeout / 5xx
//!            │
//!            ▼
//!       sleep(min(initial * 2^n, max)) ──► attempt n+1 … up to max_retries
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - After the last retry a 5xx response is returned as `Ok`; the caller
//!   decides what a non-200 status means
//! - Each attempt is bounded by the client-wide request timeout

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

// ============================================
// RetryPolicy
// ============================================

/// Backoff settings for [`RetryingHttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

// ============================================
// RetryingHttpClient
// ============================================

/// reqwest-backed [`HttpTransport`] with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryingHttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingHttpClient {
    /// Creates a client with a per-attempt `timeout`.
    ///
    /// # Errors
    /// Returns `Request` if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                reason: format!("building HTTP client: {e}"),
                transient: false,
            })?;
        Ok(Self { client, policy })
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| request_error(&request.url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(&request.url, &e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn request_error(url: &str, err: &reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_owned(),
        reason: err.to_string(),
        transient: err.is_connect() || err.is_timeout() || err.is_request() || err.is_body(),
    }
}

#[async_trait]
impl HttpTransport for RetryingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut retry = 0;
        loop {
            let outcome = self.attempt(&request).await;
            let retryable = match &outcome {
                Ok(response) => response.status >= 500,
                Err(e) => e.is_retryable(),
            };

            if !retryable || retry >= self.policy.max_retries {
                if let Ok(response) = &outcome {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        "HTTP request completed"
                    );
                }
                return outcome;
            }

            let delay = self.policy.backoff(retry);
            match &outcome {
                Ok(response) => warn!(
                    url = %request.url,
                    status = response.status,
                    retry = retry + 1,
                    ?delay,
                    "Server error, retrying"
                ),
                Err(e) => warn!(
                    url = %request.url,
                    error = %e,
                    retry = retry + 1,
                    ?delay,
                    "Request failed, retrying"
                ),
            }
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
