//! Client identification from request metadata.

use axum::http::HeaderMap;
use std::net::SocketAddr;

use crate::ratelimit::ClientKey;

/// Header carrying the proxy chain, client first.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying a single client address set by the proxy.
pub const X_REAL_IP: &str = "x-real-ip";

/// Derive a best-effort client identity from request metadata.
///
/// Resolution order:
/// 1. the first entry of `X-Forwarded-For`
/// 2. `X-Real-IP`
/// 3. the transport peer address
/// 4. the shared `"unknown"` bucket
///
/// Headers are trusted as sent. Missing, empty or non-UTF-8 values fall
/// through to the next source; this never fails.
pub fn identify(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientKey {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return ClientKey::new(first);
        }
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return ClientKey::new(real_ip);
        }
    }

    match peer {
        Some(addr) => ClientKey::new(addr.ip().to_string()),
        None => ClientKey::unknown(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
