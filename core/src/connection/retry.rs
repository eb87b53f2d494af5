//! Retry policy for transient driver errors, feeding the backup engine's
//! resume-on-failure logic and general statement retry.

use std::time::Duration;

use crate::error::Error;

/// Bounded exponential backoff applied only to [`Error::is_transient`] failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff duration before attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }

    /// Runs `op`, retrying while it returns a transient [`Error`] and attempts
    /// remain. Non-transient errors propagate immediately.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    std::thread::sleep(self.backoff_for(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy { initial_backoff: Duration::from_millis(100), max_backoff: Duration::from_millis(300), backoff_multiplier: 2.0, max_attempts: 5 };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(300));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(300));
    }

    #[test]
    fn non_transient_error_is_not_retried() {
        let policy = RetryPolicy { max_attempts: 5, initial_backoff: Duration::from_millis(1), ..Default::default() };
        let mut calls = 0;
        let result: Result<(), Error> = policy.run(|| {
            calls += 1;
            Err(Error::new("bad args", Status::InvalidArguments))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn transient_error_is_retried_until_success() {
        let policy = RetryPolicy { max_attempts: 5, initial_backoff: Duration::from_millis(1), max_backoff: Duration::from_millis(2), backoff_multiplier: 1.0 };
        let mut calls = 0;
        let result = policy.run(|| {
            calls += 1;
            if calls < 3 {
                Err(Error::new("connection lost", Status::Connection))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }
}
