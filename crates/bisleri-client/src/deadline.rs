//! A single absolute deadline shared by every wait in one run.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::StorefrontError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline; waits only end on their own.
    #[must_use]
    pub fn unbounded() -> Self {
        Self { at: None }
    }

    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Some(Instant::now() + limit),
        }
    }

    #[must_use]
    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Drives `fut` to completion unless the deadline passes first.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::DeadlineExceeded`] if the deadline has
    /// already passed or passes while `fut` is pending.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StorefrontError> {
        if self.is_expired() {
            return Err(StorefrontError::DeadlineExceeded);
        }
        match self.at {
            None => Ok(fut.await),
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| StorefrontError::DeadlineExceeded),
        }
    }

    /// Sleeps for `duration`, cut short by the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::DeadlineExceeded`] when the deadline falls
    /// inside the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), StorefrontError> {
        if duration.is_zero() {
            return if self.is_expired() {
                Err(StorefrontError::DeadlineExceeded)
            } else {
                Ok(())
            };
        }
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_never_expires() {
        let deadline = Deadline::unbounded();
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().is_none());
        assert_eq!(deadline.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn sleep_past_deadline_fails_promptly() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let result = deadline.sleep(Duration::from_secs(30)).await;
        assert!(matches!(result, Err(StorefrontError::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn expired_deadline_rejects_even_ready_futures() {
        let deadline = Deadline::after(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(deadline.is_expired());
        assert!(deadline.run(async { 1 }).await.is_err());
        assert!(deadline.sleep(Duration::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn short_sleep_within_deadline_succeeds() {
        let deadline = Deadline::after(Duration::from_secs(30));
        assert!(deadline.sleep(Duration::from_millis(1)).await.is_ok());
    }
}
