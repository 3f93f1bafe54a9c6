//! Atomic mutation of shared store values
//!
//! Catalog entries are plain string values that grow by read-modify-write,
//! which the backing store cannot make conditional on its own. The
//! [`AtomicMutator`] closes that gap: it is a retry combinator around the
//! store's `check_and_set` primitive, parameterized by an apply closure so
//! it is independent of what data it protects and unit-testable against the
//! in-memory store.
//!
//! Concurrent writers updating the same key are serialized by compare-and-
//! set retry, never by locks. A writer that loses a race re-reads and
//! re-applies; a writer whose apply closure finds nothing to change makes
//! no write at all.

use crate::error::{Error, Result};
use crate::store::EventStore;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy with exponential backoff
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Ceiling on the backoff delay
    pub max_delay: Duration,

    /// Multiplier applied per attempt
    pub multiplier: f64,

    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter {
            capped * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Check-and-set retry combinator over a shared store value
pub struct AtomicMutator<'a, S: EventStore + ?Sized> {
    store: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: EventStore + ?Sized> AtomicMutator<'a, S> {
    /// Create a mutator with the given retry policy
    pub fn new(store: &'a S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Optimistically update one value
    ///
    /// Reads the current value, passes it to `apply`, and conditionally
    /// writes the result. `apply` returning `None` means the value already
    /// reflects the desired state and nothing is written. On a
    /// check-and-set mismatch the cycle repeats under the retry policy;
    /// exhaustion surfaces [`Error::ConcurrentModification`].
    ///
    /// Returns whether a write was applied.
    pub async fn update<F>(&self, key: &str, mut apply: F) -> Result<bool>
    where
        F: FnMut(Option<&str>) -> Option<String>,
    {
        let mut attempt = 0;

        loop {
            let current = self.store.get(key).await?;

            let new = match apply(current.as_deref()) {
                Some(new) => new,
                None => return Ok(false),
            };

            if self
                .store
                .check_and_set(key, current.as_deref(), &new)
                .await?
            {
                debug!(key, attempt, "check-and-set applied");
                return Ok(true);
            }

            if !self.policy.should_retry(attempt) {
                warn!(key, attempts = attempt + 1, "check-and-set budget exhausted");
                return Err(Error::ConcurrentModification {
                    key: key.to_string(),
                    attempts: attempt + 1,
                });
            }

            let delay = self.policy.delay_for_attempt(attempt);
            debug!(key, attempt, ?delay, "check-and-set conflict, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
