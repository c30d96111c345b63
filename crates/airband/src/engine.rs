//! Media engine seam
//!
//! The controller drives an abstract queue-based media engine; the host
//! application provides the real implementation and owns the OS media
//! session tied to it. Keeping the session's visible play/pause state
//! consistent with the controller is achieved purely through this call
//! surface — the controller never touches the session directly.

use std::fmt;

use crate::registry::ChannelId;

/// A single enqueued live-stream track
#[derive(Debug, Clone)]
pub struct Track {
    /// Monotonically increasing build counter; every queue rebuild gets a
    /// fresh id, so stale and rebuilt content are distinguishable.
    pub id: u64,
    pub channel: ChannelId,
    /// Station metadata shown on the media-session controls
    pub title: String,
    /// Cache-busted playlist URL
    pub url: String,
    /// HTTP headers the engine should send when fetching the stream
    pub headers: Vec<(&'static str, String)>,
}

/// A playback failure reported by the media engine.
///
/// Carries the raw message and optional platform error code; classification
/// into a recovery class happens in [`crate::classify`].
#[derive(Debug, Clone)]
pub struct EngineError {
    pub message: String,
    pub code: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Queue-based playback engine abstraction.
///
/// Mid-stream failures are asynchronous: the host forwards them into the
/// controller mailbox as [`crate::state::Command::EngineFailed`]. Only the
/// initial `play` reports failure synchronously.
pub trait MediaEngine {
    /// Stop playback and clear the queue.
    fn reset(&mut self);

    /// Append a track to the queue.
    fn enqueue(&mut self, track: Track);

    /// Start (or resume) playback of the current queue.
    fn play(&mut self) -> Result<(), EngineError>;

    fn pause(&mut self);

    fn stop(&mut self);

    fn queue_is_empty(&self) -> bool;
}
