//! Error types for the playback core
//!
//! Centralized error handling using thiserror. Playback failures from the
//! media engine are not represented here — they arrive as
//! [`crate::engine::EngineError`] values and are recovered internally.

use thiserror::Error;

/// Main error type for the playback core
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the playback core
pub type Result<T> = std::result::Result<T, PlayerError>;
