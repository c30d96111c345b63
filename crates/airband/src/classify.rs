//! Playback failure classification
//!
//! Pure keyword matching over an engine error's message and code strings.
//! No network, no I/O. Precedence matters: HttpStatus and BehindLiveWindow
//! are the most specific classes and are checked first, so an HTTP 404 whose
//! message also contains a generic "error" or "connection" string is never
//! misrouted to the broader General or Network backoff.

use crate::engine::EngineError;

/// Recovery class assigned to a playback failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The stream endpoint answered with a non-success HTTP status
    HttpStatus,
    /// Playback position fell outside the server's live segment window
    BehindLiveWindow,
    /// The network itself is unreachable
    Network,
    /// Anything else
    General,
}

/// Substrings identifying an HTTP-status failure
const HTTP_STATUS_KEYWORDS: &[&str] = &[
    "response code",
    "http status",
    "invalid response code",
    "bad-http-status",
];

/// Substrings identifying a behind-live-window failure
const BEHIND_LIVE_WINDOW_KEYWORDS: &[&str] = &["behindlivewindow", "behind live window"];

/// Substrings identifying a network failure
const NETWORK_KEYWORDS: &[&str] = &[
    "network",
    "unable to connect",
    "failed to connect",
    "connection",
    "timed out",
    "timeout",
    "socket",
    "unresolved host",
];

fn matches_any(fields: &[&str], keywords: &[&str]) -> bool {
    fields
        .iter()
        .any(|field| keywords.iter().any(|kw| field.contains(kw)))
}

/// Assign a playback failure to a recovery class.
pub fn classify(error: &EngineError) -> ErrorClass {
    let message = error.message.to_lowercase();
    let code = error.code.as_deref().unwrap_or("").to_lowercase();
    let fields = [message.as_str(), code.as_str()];

    if matches_any(&fields, HTTP_STATUS_KEYWORDS) {
        ErrorClass::HttpStatus
    } else if matches_any(&fields, BEHIND_LIVE_WINDOW_KEYWORDS) {
        ErrorClass::BehindLiveWindow
    } else if matches_any(&fields, NETWORK_KEYWORDS) {
        ErrorClass::Network
    } else {
        ErrorClass::General
    }
}
