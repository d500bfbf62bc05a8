//! Caller-side retry for contended allocations
//!
//! Allocators never retry: a lock wait timeout or busy database is returned
//! to the caller. Callers that prefer to wait it out wrap their allocator in
//! [`RetryingAllocator`]. Every attempt is a fresh transaction, so a retried
//! allocation can skip ids but never issues one twice.

use crate::allocator::{IdAllocator, Strategy};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use wishid_core::{EntityType, Id, Result};

/// Backoff settings for [`RetryingAllocator`], read from the `[retry]` table
///
/// Attempt `n` (counting from zero) sleeps `base_delay_ms * 2^n`, never more
/// than `max_delay_ms`, before the allocation is tried again.
///
/// ```ignore
/// // Ride out short lock queues on a busy wish counter
/// let patient = RetryConfig::new()
///     .with_max_retries(5)
///     .with_max_delay_ms(250);
/// let allocator = RetryingAllocator::new(open_allocator(&config)?, patient);
/// let id = allocator.new_id(EntityType::WISH)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first failed one
    pub max_retries: usize,
    /// Sleep before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on any single sleep, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Three retries, 10 ms doubling up to 100 ms
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface every contention error immediately
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff sleep
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set the backoff ceiling
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Sleep before retry number `attempt` (zero-based)
    pub(crate) fn calculate_delay(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|exp| 2u64.checked_pow(exp))
            .unwrap_or(u64::MAX);
        let delay_ms = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

// ============================================================================
// Retrying Allocator
// ============================================================================

/// Allocator decorator retrying contention errors with backoff
#[derive(Debug)]
pub struct RetryingAllocator<A> {
    inner: A,
    config: RetryConfig,
}

impl<A: IdAllocator> RetryingAllocator<A> {
    /// Wrap `inner`
    pub fn new(inner: A, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Retry settings
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Wrapped allocator
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: IdAllocator> IdAllocator for RetryingAllocator<A> {
    fn new_id(&self, entity_type: EntityType) -> Result<Id> {
        let mut attempt = 0;
        loop {
            match self.inner.new_id(entity_type) {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.calculate_delay(attempt);
                    tracing::warn!(
                        entity_type = %entity_type,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying id allocation"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn strategy(&self) -> Strategy {
        self.inner.strategy()
    }
}
