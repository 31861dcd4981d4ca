use std::time::Duration;

pub use exponential_backoff::Backoff;

/// Determines how long to wait before retrying a failed delivery, and when
/// to give up. Mirrors the `Retry` trait used for transient I/O retries
/// elsewhere in this codebase, adapted to count delivery attempts instead
/// of wrapping a particular error type.
pub trait Retry: Clone + Send + Sync {
    /// `None` once `attempts` has exceeded the configured ceiling: the
    /// caller should treat the alert as a permanent failure.
    fn next_backoff(&self, attempts: u32) -> Option<Duration>;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    backoff: Backoff,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, min: Duration, max: Duration) -> Self {
        ExponentialBackoff {
            max_attempts,
            backoff: Backoff::new(max_attempts, min, Some(max)),
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1), Duration::from_secs(900))
    }
}

impl Retry for ExponentialBackoff {
    fn next_backoff(&self, attempts: u32) -> Option<Duration> {
        if attempts >= self.max_attempts {
            return None;
        }
        self.backoff.next(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_eventually_gives_up() {
        let b = ExponentialBackoff::new(3, Duration::from_secs(1), Duration::from_secs(60));
        let first = b.next_backoff(1).unwrap();
        let second = b.next_backoff(2).unwrap();
        assert!(second >= first);
        assert!(b.next_backoff(3).is_none());
    }
}
