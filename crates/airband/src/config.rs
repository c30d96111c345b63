//! Configuration constants for the playback core

/// Network-related configuration
pub mod network {
    /// User agent for HTTP requests
    pub const USER_AGENT: &str = concat!("Airband/", env!("CARGO_PKG_VERSION"));

    /// Referer sent alongside stream playlist requests
    pub const REFERER: &str = "https://app.airband.fm/";

    /// Accept header covering the HLS playlist content types radio CDNs serve
    pub const ACCEPT: &str =
        "application/vnd.apple.mpegurl, audio/mpegurl, application/x-mpegURL, */*";

    /// Connectivity probe endpoint (any HTTP response counts as reachable)
    pub const PROBE_URL: &str = "https://clients3.google.com/generate_204";

    /// Connectivity probe timeout in seconds
    pub const PROBE_TIMEOUT_SECS: u64 = 5;

    /// Interval between connectivity polls while blocked on the network
    pub const CONNECTIVITY_POLL_SECS: u64 = 5;
}

/// Retry and backoff configuration
pub mod retry {
    /// Attempt cap for the general (catch-all) failure class
    pub const MAX_GENERAL_RETRIES: u32 = 3;

    /// Attempt cap for the HTTP-status failure class
    pub const MAX_HTTP_STATUS_RETRIES: u32 = 5;

    /// Base delay for general exponential backoff: min(base * 2^(n-1), max)
    pub const GENERAL_BASE_DELAY_MS: u64 = 1000;

    /// Maximum general backoff delay
    pub const GENERAL_MAX_DELAY_MS: u64 = 30_000;

    /// Per-attempt step for the gentler HTTP-status ramp: min(step * n, max)
    pub const HTTP_STATUS_STEP_MS: u64 = 1000;

    /// Ceiling for the HTTP-status retry delay
    pub const HTTP_STATUS_MAX_DELAY_MS: u64 = 5000;
}

/// Playback behaviour configuration
pub mod playback {
    /// Station name tagged onto every enqueued live track
    pub const STATION_NAME: &str = "Airband Live";

    /// Queue content older than this is rebuilt instead of resumed
    pub const QUEUE_STALE_SECS: u64 = 10;
}

/// Durable state configuration
pub mod storage {
    /// State file name inside the platform config directory
    pub const STATE_FILE: &str = "playback.json";

    /// Key for the last playing channel id (parseable integer string)
    pub const KEY_LAST_CHANNEL: &str = "last_channel_id";

    /// Key for the explicit stopped-by-user flag ("true"/"false")
    pub const KEY_STOPPED_BY_USER: &str = "stopped_by_user";
}
