//! Backoff for callers of the API client. The client itself never retries.

use std::future::Future;

use rand::Rng;
use tokio::time::{sleep, Duration};

use super::ApiError;
use crate::logging::{obj, v_num, v_str, warn, Domain};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 200,
            max_delay_ms: 3000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Exponential backoff with ±jitter_factor jitter.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_delay = (clamped + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Retries `operation` while it fails with a retryable error.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                warn(
                    Domain::Api,
                    "retry",
                    obj(&[
                        ("operation", v_str(operation_name)),
                        ("attempt", v_num((attempt + 1) as f64)),
                        ("max_attempts", v_num((config.max_retries + 1) as f64)),
                        ("error", v_str(&e.to_string())),
                        ("delay_ms", v_num(delay.as_millis() as f64)),
                    ]),
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn is_retryable_http_error(status: u16) -> bool {
    matches!(status,
        408 |   // Request Timeout
        429 |   // Too Many Requests
        500 |   // Internal Server Error
        502 |   // Bad Gateway
        503 |   // Service Unavailable
        504     // Gateway Timeout
    )
}
