//! # Token Bucket
//!
//! Admission control for outbound requests. The bucket holds at most `rate`
//! tokens and refills continuously in proportion to elapsed time; a caller that
//! finds less than one token sleeps exactly long enough for the deficit to
//! refill, then re-checks.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    updated: Instant,
}

/// A shared, lock-protected token bucket.
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket admitting `rate` requests per second.
    ///
    /// A non-positive rate disables limiting.
    pub fn new(rate: f64) -> Self {
        let capacity = rate.max(1.0);
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                updated: Instant::now(),
            }),
        }
    }

    /// Waits until one token is available and takes it.
    pub async fn acquire(&self) {
        if self.rate <= 0.0 {
            return;
        }
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.updated).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
                state.updated = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_throttle() {
        let bucket = TokenBucket::new(5.0);
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(1));

        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(199));
    }

    #[tokio::test]
    async fn test_zero_rate_is_unlimited() {
        let bucket = TokenBucket::new(0.0);
        for _ in 0..100 {
            bucket.acquire().await;
        }
    }
}
