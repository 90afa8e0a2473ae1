//! Best-effort client IP and country extraction
//!
//! Both values are audit metadata only; nothing gates on them. The IP
//! prefers the first hop of `x-forwarded-for` (the service normally sits
//! behind a proxy) and falls back to the raw connection address. Country
//! comes from a CDN geolocation header when one is present, otherwise
//! "Unknown".

use axum::http::HeaderMap;
use std::net::SocketAddr;

const UNKNOWN_COUNTRY: &str = "Unknown";

/// Client IP: first `x-forwarded-for` entry, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Country code from a CDN geolocation header, else "Unknown".
pub fn client_country(headers: &HeaderMap) -> String {
    headers
        .get("cf-ipcountry")
        .or_else(|| headers.get("x-geo-country"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
}
