use crate::domain::ports::Pacer;
use crate::utils::error::{CentralError, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;

/// 不等待，測試用
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacer;

#[async_trait]
impl Pacer for NoPacer {
    async fn pace(&self) {}
}

/// 記錄伺服器回傳的 Retry-After，下一次 pace 時消耗
#[derive(Debug, Default)]
struct RetryAfterSlot {
    pending: Mutex<Option<Duration>>,
}

impl RetryAfterSlot {
    fn store(&self, retry_after: Option<Duration>) {
        let Some(wait) = retry_after else {
            return;
        };
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(pending.map_or(wait, |current| current.max(wait)));
        }
    }

    fn take(&self) -> Option<Duration> {
        self.pending.lock().ok()?.take()
    }
}

/// 每次請求之間固定等待
#[derive(Debug)]
pub struct FixedDelayPacer {
    delay: Duration,
    retry_after: RetryAfterSlot,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            retry_after: RetryAfterSlot::default(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacer for FixedDelayPacer {
    async fn pace(&self) {
        let wait = match self.retry_after.take() {
            Some(retry_after) => {
                tracing::debug!("⏳ Honoring Retry-After of {:?}", retry_after);
                retry_after.max(self.delay)
            }
            None => self.delay,
        };
        tokio::time::sleep(wait).await;
    }

    fn observe(&self, retry_after: Option<Duration>) {
        self.retry_after.store(retry_after);
    }
}

/// Token bucket 節流
pub struct TokenBucketPacer {
    limiter: DefaultDirectRateLimiter,
    retry_after: RetryAfterSlot,
}

impl TokenBucketPacer {
    pub fn new(requests_per_second: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            CentralError::InvalidConfigValueError {
                field: "pacing.requests_per_second".to_string(),
                value: requests_per_second.to_string(),
                reason: "Must be greater than zero".to_string(),
            }
        })?;
        let burst = NonZeroU32::new(burst).ok_or_else(|| CentralError::InvalidConfigValueError {
            field: "pacing.burst".to_string(),
            value: burst.to_string(),
            reason: "Must be greater than zero".to_string(),
        })?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            retry_after: RetryAfterSlot::default(),
        })
    }
}

#[async_trait]
impl Pacer for TokenBucketPacer {
    async fn pace(&self) {
        if let Some(retry_after) = self.retry_after.take() {
            tracing::debug!("⏳ Honoring Retry-After of {:?}", retry_after);
            tokio::time::sleep(retry_after).await;
        }
        self.limiter.until_ready().await;
    }

    fn observe(&self, retry_after: Option<Duration>) {
        self.retry_after.store(retry_after);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_no_pacer_returns_immediately() {
        let start = Instant::now();
        NoPacer.pace().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_fixed_delay_sleeps_for_delay() {
        let pacer = FixedDelayPacer::new(Duration::from_millis(30));
        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_fixed_delay_honors_retry_after_once() {
        let pacer = FixedDelayPacer::new(Duration::from_millis(10));
        pacer.observe(Some(Duration::from_millis(80)));

        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() >= Duration::from_millis(80));

        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() < Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_token_bucket_limits_rate() {
        let pacer = TokenBucketPacer::new(20, 1).unwrap();
        let start = Instant::now();
        // 第一個 token 立即可用，之後每 50ms 一個
        for _ in 0..3 {
            pacer.pace().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn test_token_bucket_rejects_zero_rate() {
        assert!(TokenBucketPacer::new(0, 1).is_err());
        assert!(TokenBucketPacer::new(5, 0).is_err());
    }
}
