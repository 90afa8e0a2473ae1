//! Redirect-template normalization
//!
//! Outcome callbacks must land on this service's own `/redirect/{kind}`
//! endpoint or session state could never be updated, so administrator-
//! supplied callback URLs are rewritten rather than trusted: scheme, host
//! and port are pinned to the public base URL and the path is forced to
//! the redirect endpoint. Extra query parameters the administrator added
//! are preserved verbatim, and a `mid` parameter is guaranteed, holding
//! the literal `{MASKED_ID}` placeholder until a session fills it in.
//! Malformed input degrades to the deterministic fallback form; this
//! function never fails.

use url::Url;

use crate::models::OutcomeKind;

/// Rewrite `raw` so it targets `{base}/redirect/{outcome}` while keeping
/// the administrator's extra query parameters. Empty or unparseable
/// input yields `{base}/redirect/{outcome}?mid={MASKED_ID}`.
pub fn normalize(outcome: OutcomeKind, raw: &str, base: &Url) -> String {
    let mut out = base.clone();
    out.set_path(&format!("/redirect/{}", outcome.as_str()));

    // Query parameters survive; everything else about the supplied URL
    // (scheme, host, path) is discarded. Raw pairs are carried over
    // without re-encoding so whatever the administrator pasted is kept
    // byte for byte.
    let supplied_query = Url::options()
        .base_url(Some(base))
        .parse(raw.trim())
        .ok()
        .and_then(|u| u.query().map(str::to_string));

    let mut pairs: Vec<String> = Vec::new();
    let mut mid: Option<String> = None;
    if let Some(query) = supplied_query {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key == "mid" {
                mid = Some(value.to_string());
            } else {
                pairs.push(pair.to_string());
            }
        }
    }

    // `mid` is always present; an absent or empty value becomes the
    // placeholder so per-session substitution can fill it later.
    let mid = mid.filter(|v| !v.is_empty()).unwrap_or_else(|| "{MASKED_ID}".to_string());
    pairs.push(format!("mid={mid}"));
    out.set_query(Some(&pairs.join("&")));

    out.to_string()
}
