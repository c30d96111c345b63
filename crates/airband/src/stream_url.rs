//! Stream URL construction
//!
//! Builds cache-busted playback URLs so CDN edge caches never serve stale
//! playlist segments on reconnect, plus the HTTP headers radio CDNs expect
//! alongside the playlist request.

use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::config::network::{ACCEPT, REFERER, USER_AGENT};

const VERSION_TAG: &str = env!("CARGO_PKG_VERSION");

/// Append freshness query parameters (`_t` timestamp, `_cb` random token,
/// `_v` version tag) to a base URL.
///
/// A malformed base falls back to naive string concatenation of the same
/// parameters rather than failing — a broken stream key should still reach
/// the engine, whose own error path handles it.
pub fn freshen(base_url: &str) -> String {
    let timestamp = unix_millis();
    let token = cache_buster();

    match Url::parse(base_url) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("_t", &timestamp.to_string())
                .append_pair("_cb", &token)
                .append_pair("_v", VERSION_TAG);
            url.to_string()
        }
        Err(_) => {
            let sep = if base_url.contains('?') { '&' } else { '?' };
            format!("{base_url}{sep}_t={timestamp}&_cb={token}&_v={VERSION_TAG}")
        }
    }
}

/// HTTP headers attached to every enqueued track's stream request.
pub fn request_headers() -> Vec<(&'static str, String)> {
    vec![
        ("User-Agent", USER_AGENT.to_string()),
        ("Referer", REFERER.to_string()),
        ("Accept", ACCEPT.to_string()),
    ]
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn cache_buster() -> String {
    format!("{:016x}", rand::random::<u64>())
}
