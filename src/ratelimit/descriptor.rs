//! Counter key generation and handling.

use std::fmt;
use std::sync::Arc;

/// Sentinel client identity used when no address signal is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A best-effort client identity used to bucket requests.
///
/// This is not a verified identity: clients behind the same proxy hop, or
/// clients with no usable address at all, share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Create a client key from a raw identity string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The shared bucket for unidentifiable clients.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    /// Whether this is the shared `"unknown"` bucket.
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key that uniquely identifies a counter in the store.
///
/// The rule id is shared with the registry, so building a key only allocates
/// for the client part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// The rule this counter belongs to
    pub rule_id: Arc<str>,
    /// The client being counted
    pub client: ClientKey,
}

impl CounterKey {
    /// Create a new counter key from a rule id and client.
    pub fn new(rule_id: Arc<str>, client: ClientKey) -> Self {
        Self { rule_id, client }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rule_id, self.client)
    }
}
