//! Shared playback state and controller commands
//!
//! `Command` is the unified message type entering the controller mailbox
//! from any surface: in-app UI, OS remote controls, connectivity callbacks,
//! and the media engine's failure events. `PlaybackState` is the snapshot
//! read by UI layers.

use std::time::Instant;

use crate::engine::EngineError;
use crate::registry::ChannelId;

/// Messages accepted by the controller mailbox
#[derive(Debug)]
pub enum Command {
    /// In-app channel selection
    PlayChannel(ChannelId),
    /// In-app pause (keep the session resumable)
    Pause,
    /// Explicit in-app stop
    Stop,
    /// OS media-session "play" control
    RemotePlay,
    /// OS media-session "pause" control
    RemotePause,
    /// OS reachability flip
    ConnectivityChanged(bool),
    /// Asynchronous playback failure from the media engine
    EngineFailed(EngineError),
    /// Tear down the controller loop
    Shutdown,
}

/// Snapshot of the controller's playback state
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// True only while audio is actually flowing
    pub is_streaming_active: bool,
    /// Last channel the controller attempted to play
    pub current_channel: Option<ChannelId>,
    /// Set whenever playback pauses or stops; decides queue staleness
    pub last_stop: Option<Instant>,
    /// True only after the explicit in-app stop action. While set, remote
    /// "play" never restarts playback.
    pub stopped_by_user: bool,
    /// Mirror of the latest connectivity information
    pub network_available: bool,
    /// The recovery engine is blocked waiting for connectivity
    pub awaiting_network: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_streaming_active: false,
            current_channel: None,
            last_stop: None,
            stopped_by_user: false,
            network_available: true,
            awaiting_network: false,
        }
    }
}
