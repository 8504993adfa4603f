//! Turning limiter decisions into HTTP outcomes.

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ratelimit::{Decision, Millis};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Body message sent with every 429.
pub const THROTTLED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Whole seconds until `reset_at`, rounded up. Never negative.
pub fn retry_after_secs(reset_at: Millis, now: Millis) -> u64 {
    reset_at.saturating_sub(now).div_ceil(1000)
}

/// Attach the informational quota headers.
pub fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at));
}

/// Annotate a downstream response for an allowed request.
pub fn decorate(mut response: Response, decision: &Decision) -> Response {
    apply_headers(response.headers_mut(), decision);
    response
}

/// Build the 429 response for a denied request.
pub fn reject(decision: &Decision, now: Millis) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": THROTTLED_MESSAGE })),
    )
        .into_response();

    let headers = response.headers_mut();
    apply_headers(headers, decision);
    headers.insert(
        RETRY_AFTER,
        HeaderValue::from(retry_after_secs(decision.reset_at, now)),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(allowed: bool, remaining: u32, reset_at: Millis) -> Decision {
        Decision {
            allowed,
            limit: 5,
            remaining,
            reset_at,
        }
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(1_000 + 1_500, 1_000), 2);
        assert_eq!(retry_after_secs(1_000 + 1_000, 1_000), 1);
        assert_eq!(retry_after_secs(1_000 + 1, 1_000), 1);
        assert_eq!(retry_after_secs(600_000, 0), 600);
    }

    #[test]
    fn test_retry_after_never_negative() {
        assert_eq!(retry_after_secs(1_000, 1_000), 0);
        assert_eq!(retry_after_secs(1_000, 5_000), 0);
    }

    #[test]
    fn test_decorate_adds_headers() {
        let response = decorate(StatusCode::ACCEPTED.into_response(), &decision(true, 3, 42_000));

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let headers = response.headers();
        assert_eq!(headers[X_RATELIMIT_LIMIT], "5");
        assert_eq!(headers[X_RATELIMIT_REMAINING], "3");
        assert_eq!(headers[X_RATELIMIT_RESET], "42000");
        assert!(headers.get(RETRY_AFTER).is_none());
    }

    #[test]
    fn test_reject_builds_429() {
        let response = reject(&decision(false, 0, 11_500), 10_000);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers[X_RATELIMIT_LIMIT], "5");
        assert_eq!(headers[X_RATELIMIT_REMAINING], "0");
        assert_eq!(headers[X_RATELIMIT_RESET], "11500");
        assert_eq!(headers[RETRY_AFTER], "2");
        assert_eq!(headers["content-type"], "application/json");
    }
}
