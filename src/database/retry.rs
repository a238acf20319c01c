use std::future::Future;
use std::time::Duration;

use crate::errors::AppError;

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts, backoff }
    }

    /// Policy for single queries: one retry after two seconds.
    pub const fn query_default() -> Self {
        Self::new(2, Duration::from_secs(2))
    }

    /// Policy for the startup connection check: three attempts, five seconds apart.
    pub const fn startup_default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget runs out.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && retryable(&e) => {
                    tracing::warn!(
                        query = label,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// `run` specialised for sqlx: retries timeouts, and reports an
    /// exhausted timeout as `AppError::DatabaseTimeout`.
    pub async fn query<T, F, Fut>(&self, label: &str, op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        self.run(label, op, is_timeout).await.map_err(|e| {
            if is_timeout(&e) {
                AppError::DatabaseTimeout
            } else {
                AppError::Database(e)
            }
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::query_default()
    }
}

pub fn is_timeout(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn retries_timeouts_up_to_budget() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), AppError> = quick(2)
            .query("select", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(sqlx::Error::PoolTimedOut)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(AppError::DatabaseTimeout)));
    }

    #[tokio::test]
    async fn succeeds_after_transient_timeout() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = quick(3)
            .query("select", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), AppError> = quick(5)
            .query("select", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(sqlx::Error::RowNotFound)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(AppError::Database(sqlx::Error::RowNotFound))));
    }

    #[tokio::test]
    async fn custom_predicate_controls_retry() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), String> = quick(4)
            .run(
                "custom",
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("busy".to_string())
                },
                |e: &String| e == "busy",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
