//! Core rate limiter implementation.

use std::sync::Arc;
use tracing::{debug, trace};

use super::counter::{Millis, WindowCounter};
use super::descriptor::{ClientKey, CounterKey};
use super::rules::Rule;
use super::store::RateLimitStore;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The rule's configured limit
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: Millis,
}

/// Fixed-window rate limiter over a shared counter store.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
}

impl RateLimiter {
    /// Create a rate limiter backed by `store`.
    pub fn new(store: Arc<RateLimitStore>) -> Self {
        Self { store }
    }

    /// Count one request from `client` against `rule` at time `now`.
    ///
    /// Expired windows are replaced lazily here. When the store has grown to
    /// its threshold an inline sweep runs first.
    pub fn check(&self, rule: &Rule, client: &ClientKey, now: Millis) -> Decision {
        self.store.evict_if_full(now);

        let key = CounterKey::new(rule.shared_id(), client.clone());

        trace!(key = %key, now = now, "Checking rate limit");

        let counter = self.store.update(key, |current| match current {
            Some(mut counter) if !counter.is_expired(now) => {
                counter.increment();
                counter
            }
            _ => {
                debug!(
                    rule = rule.id(),
                    client = %client,
                    window_ms = rule.window_ms(),
                    "Opening new rate limit window"
                );
                WindowCounter::open(now, rule.window_ms())
            }
        });

        let allowed = counter.count <= rule.limit();
        if !allowed {
            debug!(
                rule = rule.id(),
                client = %client,
                count = counter.count,
                limit = rule.limit(),
                "Rate limit exceeded"
            );
        }

        Decision {
            allowed,
            limit: rule.limit(),
            remaining: counter.remaining(rule.limit()),
            reset_at: counter.window_reset_at,
        }
    }

    /// Get the current count for a rule and client, if a counter exists.
    pub fn get_counter_value(&self, rule: &Rule, client: &ClientKey) -> Option<u32> {
        let key = CounterKey::new(rule.shared_id(), client.clone());
        self.store.get(&key).map(|counter| counter.count)
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Arc::new(RateLimitStore::default()))
    }
}
