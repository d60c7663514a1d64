use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window request limiter for outbound API calls.
///
/// Allows at most `max_per_window` requests within any one-window span.
/// `acquire` blocks the caller until a slot opens; timestamps of granted
/// requests are kept and expired as the window slides forward.
pub struct RequestThrottle {
    max_per_window: usize,
    window: Duration,
    granted: Mutex<VecDeque<Instant>>,
}

impl RequestThrottle {
    #[must_use]
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_per_window = max_requests.max(1) as usize;
        Self {
            max_per_window,
            window,
            granted: Mutex::new(VecDeque::with_capacity(max_per_window)),
        }
    }

    /// Waits until a request slot is available, then claims it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut granted = self.granted.lock().await;
                let now = Instant::now();

                while let Some(front) = granted.front() {
                    if now.duration_since(*front) >= self.window {
                        granted.pop_front();
                    } else {
                        break;
                    }
                }

                if granted.len() < self.max_per_window {
                    granted.push_back(now);
                    return;
                }

                // Sleep until the oldest in-window request expires, then
                // re-check: another caller may have claimed the slot first.
                granted
                    .front()
                    .map_or(self.window, |front| self.window - now.duration_since(*front))
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests currently counted against the window.
    pub async fn in_flight(&self) -> usize {
        let mut granted = self.granted.lock().await;
        let now = Instant::now();

        while let Some(front) = granted.front() {
            if now.duration_since(*front) >= self.window {
                granted.pop_front();
            } else {
                break;
            }
        }

        granted.len()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_per_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_limit_is_immediate() {
        let throttle = RequestThrottle::per_second(4);

        let start = Instant::now();
        for _ in 0..4 {
            throttle.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(throttle.in_flight().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifth_request_waits_for_window() {
        let throttle = RequestThrottle::per_second(4);

        for _ in 0..4 {
            throttle.acquire().await;
        }

        let start = Instant::now();
        throttle.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let throttle = RequestThrottle::per_second(2);

        throttle.acquire().await;
        tokio::time::advance(Duration::from_millis(600)).await;
        throttle.acquire().await;

        // First slot expires 1s after it was taken, i.e. 400ms from now.
        let start = Instant::now();
        throttle.acquire().await;
        let waited = start.elapsed();

        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_drains() {
        let throttle = RequestThrottle::per_second(3);

        throttle.acquire().await;
        throttle.acquire().await;
        assert_eq!(throttle.in_flight().await, 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(throttle.in_flight().await, 0);
    }
}
