//! Exponential backoff for calls to the inference endpoints.
//!
//! Hosted model endpoints cold-start and rate-limit, so 408, 429 and 5xx
//! responses and network errors are retried. Other client errors fail at once.

use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Send a request until it succeeds, fails permanently, or attempts run out.
///
/// `send` builds and sends a fresh request each time it is called.
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    service: &str,
    send: F,
) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: Future<Output = reqwest::Result<Response>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=attempts {
        match send().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", service, attempt);
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                if !is_retryable(status) {
                    anyhow::bail!("{} returned {}: {}", service, status, snippet);
                }
                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    service,
                    status,
                    attempt,
                    attempts,
                    snippet
                );
                last_error = format!("{} returned {}", service, status);
            }
            Err(e) => {
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    service,
                    attempt,
                    attempts,
                    e
                );
                last_error = format!("{}: {}", service, e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    anyhow::bail!("gave up after {} attempts: {}", attempts, last_error)
}
