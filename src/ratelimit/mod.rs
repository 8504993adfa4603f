//! Rate limiting logic and state management.

mod counter;
mod descriptor;
mod limiter;
mod rules;
mod store;

pub use counter::{Millis, WindowCounter};
pub use descriptor::{ClientKey, CounterKey, UNKNOWN_CLIENT};
pub use limiter::{Decision, RateLimiter};
pub use rules::{default_rules, PathPattern, Rule, RuleConfig, RuleRegistry, RulesDocument};
pub use store::{RateLimitStore, DEFAULT_MAX_STORE_SIZE};
