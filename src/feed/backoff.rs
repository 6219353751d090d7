use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::FeedConfig;

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    /// Retries after the first attempt
    pub retries: u32,
}

impl Backoff {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            base: Duration::from_millis(config.backoff_base_ms),
            max: Duration::from_millis(config.backoff_max_ms),
            retries: config.connect_retries,
        }
    }

    /// Delay before retry `attempt` (0-based), jittered into `[d/2, d]`
    /// where `d = min(max, base * 2^attempt)`
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.saturating_mul(2u32.saturating_pow(attempt));
        let ceiling = exp.min(self.max).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let jittered = rand::thread_rng().gen_range(ceiling / 2..=ceiling);
        Duration::from_millis(jittered)
    }

    /// Run `op` until it succeeds or retries are exhausted
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {:#}; retrying in {:?}",
                        what,
                        attempt + 1,
                        self.retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> Backoff {
        Backoff {
            base: Duration::from_millis(1),
            max: Duration::from_millis(4),
            retries: 3,
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let backoff = Backoff {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            retries: 10,
        };

        for attempt in 0..10 {
            let delay = backoff.delay(attempt);
            assert!(delay <= Duration::from_millis(1000));
        }
        let first = backoff.delay(0);
        assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = &AtomicU32::new(0);
        let value = fast()
            .retry("connect", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("refused")
                }
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast()
            .retry("connect", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("refused")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
