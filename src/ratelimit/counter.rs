//! Fixed-window counter state.

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// The counter for one client's current window under one rule.
///
/// `window_reset_at` is fixed when the window opens and is never extended;
/// once `now` passes it the counter is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    /// Requests observed in the current window (always at least 1)
    pub count: u32,
    /// Instant at which the current window ends
    pub window_reset_at: Millis,
}

impl WindowCounter {
    /// Open a new window at `now` with a single observed request.
    pub fn open(now: Millis, window_ms: u64) -> Self {
        Self {
            count: 1,
            window_reset_at: now.saturating_add(window_ms),
        }
    }

    /// Whether the window has elapsed.
    pub fn is_expired(&self, now: Millis) -> bool {
        now > self.window_reset_at
    }

    /// Record one more request in this window and return the new count.
    pub fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Remaining quota for the given limit.
    pub fn remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.count)
    }
}
