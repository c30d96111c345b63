//! Network connectivity monitoring
//!
//! Wraps reachability into a simple Connected/Disconnected probe. A probe
//! failure of any kind is reported as Disconnected, never as an error —
//! callers only ever see the boolean answer.
//!
//! Asynchronous reachability flips from the OS enter the controller as
//! [`crate::state::Command::ConnectivityChanged`] messages; this module only
//! covers the point-in-time probe side.

use std::time::Duration;

use crate::config::network::{PROBE_TIMEOUT_SECS, PROBE_URL, USER_AGENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    pub fn is_connected(self) -> bool {
        matches!(self, Connectivity::Connected)
    }
}

/// Point-in-time connectivity check. May block on I/O.
pub trait ConnectivityProbe {
    fn check(&self) -> Connectivity;
}

/// HTTP probe against a lightweight endpoint. Any HTTP response — including
/// an error status — proves the network is up; only a transport failure
/// counts as Disconnected.
pub struct HttpProbe {
    client: Option<reqwest::blocking::Client>,
    url: String,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::with_url(PROBE_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .ok();
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityProbe for HttpProbe {
    fn check(&self) -> Connectivity {
        // A client that failed to build behaves like a dead network.
        let Some(client) = &self.client else {
            return Connectivity::Disconnected;
        };
        match client.get(&self.url).send() {
            Ok(_) => Connectivity::Connected,
            Err(_) => Connectivity::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_connected_helper() {
        assert!(Connectivity::Connected.is_connected());
        assert!(!Connectivity::Disconnected.is_connected());
    }

    #[test]
    fn probe_error_maps_to_disconnected() {
        // Unroutable TEST-NET-1 address — the request fails fast and the
        // probe must answer Disconnected rather than surfacing the error.
        let probe = HttpProbe::with_url("http://192.0.2.1:9/");
        assert_eq!(probe.check(), Connectivity::Disconnected);
    }
}
