//! The admission-control gate and its axum middleware.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::client::identify;
use super::response::{decorate, reject};
use crate::config::RateLimitingConfig;
use crate::error::Result;
use crate::ratelimit::{Decision, Millis, RateLimitStore, RateLimiter, RuleRegistry};

/// What the gate decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No rule matches the path; the request is not metered
    Unmetered,
    /// Within quota
    Allowed(Decision),
    /// Over quota
    Denied(Decision),
}

/// Rule matching, client identification and limiting, composed.
pub struct Gate {
    registry: RuleRegistry,
    limiter: RateLimiter,
}

impl Gate {
    /// Create a gate over an existing registry and store.
    pub fn new(registry: RuleRegistry, store: Arc<RateLimitStore>) -> Self {
        Self {
            registry,
            limiter: RateLimiter::new(store),
        }
    }

    /// Build the rule table and store described by configuration.
    ///
    /// A rules file, when configured, replaces the inline rule list.
    pub fn from_config(config: &RateLimitingConfig) -> Result<Self> {
        let registry = match config.rules_path {
            Some(ref path) => RuleRegistry::from_file(path)?,
            None => RuleRegistry::new(&config.rules)?,
        };
        let store = Arc::new(RateLimitStore::new(config.max_store_size));

        info!(
            rules = registry.len(),
            max_store_size = config.max_store_size,
            "Admission gate configured"
        );

        Ok(Self::new(registry, store))
    }

    /// Decide whether a request may proceed.
    ///
    /// Paths matching no rule return [`Verdict::Unmetered`] without touching
    /// the store.
    pub fn evaluate(
        &self,
        path: &str,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        now: Millis,
    ) -> Verdict {
        let Some(rule) = self.registry.match_path(path) else {
            return Verdict::Unmetered;
        };

        let client = identify(headers, peer);
        let decision = self.limiter.check(rule, &client, now);

        if decision.allowed {
            Verdict::Allowed(decision)
        } else {
            info!(
                rule = rule.id(),
                client = %client,
                reset_at = decision.reset_at,
                "Request throttled"
            );
            Verdict::Denied(decision)
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        self.limiter.store()
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis().max(0) as Millis
}

/// Middleware applying the gate in front of the wrapped routes.
///
/// A fault while deciding lets the request through unannotated.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn admission_control(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let now = now_millis();
    apply_verdict(request, next, now, |request| {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        gate.evaluate(request.uri().path(), request.headers(), peer, now)
    })
    .await
}

/// Run `decide` for `request` and act on its verdict.
///
/// A panic inside `decide` is logged and the request is passed through.
async fn apply_verdict<F>(request: Request, next: Next, now: Millis, decide: F) -> Response
where
    F: FnOnce(&Request) -> Verdict,
{
    let verdict = panic::catch_unwind(AssertUnwindSafe(|| decide(&request)));

    match verdict {
        Ok(Verdict::Unmetered) => next.run(request).await,
        Ok(Verdict::Allowed(decision)) => decorate(next.run(request).await, &decision),
        Ok(Verdict::Denied(decision)) => reject(&decision, now),
        Err(_) => {
            error!("Admission check failed, letting request through");
            next.run(request).await
        }
    }
}
