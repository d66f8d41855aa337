//! Per-attempt timeout plus bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use talentrag_core::config::LlmSettings;
use talentrag_core::error::{Error, ProviderErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_settings(llm: &LlmSettings) -> Self {
        Self {
            max_retries: llm.max_retries,
            base_backoff: Duration::from_millis(llm.backoff_ms),
            attempt_timeout: Duration::from_secs(llm.timeout_secs),
        }
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << retry.min(16))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. An attempt exceeding `attempt_timeout` counts as
    /// a `Timeout` provider error.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(res) => res,
                Err(_) => Err(Error::provider(
                    ProviderErrorKind::Timeout,
                    format!("{label}: no response within {:?}", self.attempt_timeout),
                )),
            };
            match outcome {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.backoff(retry);
                    tracing::warn!(call = label, attempt = retry + 1, delay_ms = delay.as_millis() as u64, error = %e, "retrying provider call");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(call = label, attempts = retry + 1, error = %e, "provider retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, base_backoff: Duration::from_millis(10), attempt_timeout: Duration::from_secs(1) }
    }

    #[test]
    fn backoff_doubles() {
        let p = policy(3);
        assert_eq!(p.backoff(0), Duration::from_millis(10));
        assert_eq!(p.backoff(1), Duration::from_millis(20));
        assert_eq!(p.backoff(3), Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let out = policy(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::provider(ProviderErrorKind::RateLimited, "429"))
                } else {
                    Ok("done")
                }
            })
            .await
            .expect("third attempt succeeds");
        assert_eq!(out, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let err = policy(2)
            .run::<(), _, _>("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::provider(ProviderErrorKind::Unavailable, "503"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { kind: ProviderErrorKind::Unavailable, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let _ = policy(5)
            .run::<(), _, _>("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::provider(ProviderErrorKind::Http, "401"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out() {
        let err = policy(0)
            .run::<(), _, _>("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { kind: ProviderErrorKind::Timeout, .. }));
    }
}
