use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

#[derive(Debug)]
pub enum RetryError<E> {
    Fatal(E),
    AttemptsExceeded(E),
}

/// Retry policy for spreadsheet reads only (§4.1): 429 and 5xx are retried with
/// exponential backoff and jitter (1s, 2s, 4s, each +/-500ms), up to three
/// attempts; other statuses fail immediately. Not used anywhere else in the
/// engine - warehouse reads and sink calls fail fast.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        mut op: F,
        classify: Classifier,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return Err(RetryError::Fatal(err)),
                    RetryDisposition::Retry => {
                        if attempt + 1 >= self.max_attempts {
                            return Err(RetryError::AttemptsExceeded(err));
                        }
                        sleep(self.backoff_delay(attempt)).await;
                        attempt += 1;
                    }
                },
            }
        }
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64 * (1u64 << attempt.min(2));
        let jitter_ms = self.jitter.as_millis() as i64;
        let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);
        let delay_ms = (base_ms as i64 + offset).max(0) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Retryable iff the source returned HTTP 429 or any 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestError(u16);

    #[tokio::test]
    async fn retries_up_to_three_attempts_then_fails() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(0),
            jitter: Duration::from_millis(0),
        };
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError(503))
                    }
                },
                |err: &TestError| {
                    if is_retryable_status(err.0) {
                        RetryDisposition::Retry
                    } else {
                        RetryDisposition::Stop
                    }
                },
            )
            .await;

        assert!(matches!(result, Err(RetryError::AttemptsExceeded(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = policy
            .run(
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError(404))
                    }
                },
                |err: &TestError| {
                    if is_retryable_status(err.0) {
                        RetryDisposition::Retry
                    } else {
                        RetryDisposition::Stop
                    }
                },
            )
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
