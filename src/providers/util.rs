use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Exponential backoff settings for upstream calls.
///
/// The first retry waits `initial_delay_ms`; each further retry multiplies the wait by
/// `multiplier`, never exceeding `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 800,
            max_delay_ms: 5000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before the given retry, counting retries from zero.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Retries an async operation according to this policy
    ///
    /// # Parameters
    /// - `operation`: Closure returning a future
    ///
    /// # Returns
    /// Either the successful result or the error of the last attempt. The operation runs
    /// at most `1 + max_retries` times.
    pub async fn retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    if retry >= self.max_retries {
                        return Err(err);
                    }
                    let delay = self.delay_for(retry);
                    retry += 1;
                    debug!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}...",
                        retry,
                        self.max_retries + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Runs `worker` over `items` with at most `concurrency` calls in flight.
///
/// A fixed set of workers pull from a shared queue until it is empty. Results come back in
/// completion order.
pub async fn run_pool<I, T, F, Fut>(items: Vec<I>, concurrency: usize, worker: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let workers = concurrency.max(1).min(items.len());
    let queue = Mutex::new(items.into_iter());
    let queue = &queue;
    let worker = &worker;

    let batches = futures::future::join_all((0..workers).map(|_| async move {
        let mut done = Vec::new();
        loop {
            let next = queue.lock().await.next();
            let Some(item) = next else {
                break;
            };
            done.push(worker(item).await);
        }
        done
    }))
    .await;

    batches.into_iter().flatten().collect()
}

/// Removes blank and repeated entries, keeping first occurrences in order.
pub fn dedupe(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
