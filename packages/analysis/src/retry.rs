//! Retry with exponential backoff for POI fetches.
//!
//! Each attempt is bounded by its own timeout. Only transient errors
//! (timeouts, connection failures, HTTP 429 and 5xx) are retried; the
//! delay starts at the configured backoff and doubles per retry.

use std::time::Duration;

use urbansight_config::RetryConfig;
use urbansight_poi::{PoiProvider, ProviderError};
use urbansight_poi_models::{Coordinate, PoiCategory, RawPoi};

/// Delay before retry number `retry` (1-based).
#[must_use]
pub fn backoff_delay(policy: &RetryConfig, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    policy.backoff().saturating_mul(1_u32 << exponent)
}

/// Fetches one category, retrying transient failures.
///
/// # Errors
///
/// Returns the last [`ProviderError`] once retries are exhausted, or the
/// first permanent error.
pub async fn fetch_with_retry(
    provider: &dyn PoiProvider,
    origin: Coordinate,
    radius_m: f64,
    category: PoiCategory,
    policy: &RetryConfig,
    attempt_timeout: Duration,
) -> Result<Vec<RawPoi>, ProviderError> {
    let mut retry = 0;

    loop {
        let result =
            match tokio::time::timeout(attempt_timeout, provider.fetch(origin, radius_m, category))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    millis: u64::try_from(attempt_timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            };

        match result {
            Ok(pois) => return Ok(pois),
            Err(e) if e.is_transient() && retry < policy.max => {
                retry += 1;
                let delay = backoff_delay(policy, retry);
                log::warn!(
                    "{category}: transient error from {}: {e} (retry {retry}/{} in {delay:?})",
                    provider.id(),
                    policy.max,
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::debug!("{category}: giving up after {} attempts: {e}", retry + 1);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Fails with `error_status` for the first `failures` calls.
    struct FlakyProvider {
        failures: u32,
        error_status: u16,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        const fn new(failures: u32, error_status: u16) -> Self {
            Self {
                failures,
                error_status,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PoiProvider for FlakyProvider {
        fn id(&self) -> &str {
            "flaky"
        }

        async fn fetch(
            &self,
            origin: Coordinate,
            _radius_m: f64,
            _category: PoiCategory,
        ) -> Result<Vec<RawPoi>, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ProviderError::Status {
                    status: self.error_status,
                });
            }
            Ok(vec![RawPoi {
                id: "node/1".to_string(),
                coordinate: origin,
                tags: std::collections::BTreeMap::new(),
            }])
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl PoiProvider for SlowProvider {
        fn id(&self) -> &str {
            "slow"
        }

        async fn fetch(
            &self,
            _origin: Coordinate,
            _radius_m: f64,
            _category: PoiCategory,
        ) -> Result<Vec<RawPoi>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }
    }

    const fn policy(max: u32) -> RetryConfig {
        RetryConfig { max, backoff_ms: 1 }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryConfig {
            max: 5,
            backoff_ms: 500,
        };
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(&policy, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let provider = FlakyProvider::new(2, 503);
        let result = fetch_with_retry(
            &provider,
            Coordinate::new(0.0, 0.0),
            1000.0,
            PoiCategory::Park,
            &policy(2),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let provider = FlakyProvider::new(10, 429);
        let result = fetch_with_retry(
            &provider,
            Coordinate::new(0.0, 0.0),
            1000.0,
            PoiCategory::Park,
            &policy(2),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(ProviderError::Status { status: 429 })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let provider = FlakyProvider::new(10, 400);
        let result = fetch_with_retry(
            &provider,
            Coordinate::new(0.0, 0.0),
            1000.0,
            PoiCategory::Park,
            &policy(2),
            Duration::from_secs(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_timeout_is_transient() {
        let result = fetch_with_retry(
            &SlowProvider,
            Coordinate::new(0.0, 0.0),
            1000.0,
            PoiCategory::Park,
            &policy(1),
            Duration::from_millis(10),
        )
        .await;

        assert!(matches!(result, Err(ProviderError::Timeout { millis: 10 })));
    }
}
