//! Durable playback state
//!
//! Two string entries survive process restarts: the last playing channel id
//! and the explicit stopped-by-user flag. Each is written independently
//! whenever its field changes. The default backing is a small JSON map file
//! in the platform config directory; an in-memory store serves tests and
//! ephemeral embedders.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::config::storage::{KEY_LAST_CHANNEL, KEY_STOPPED_BY_USER, STATE_FILE};
use crate::error::{PlayerError, Result};
use crate::registry::ChannelId;

/// Durable string key/value storage.
pub trait StateStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file-backed store. Each `set` rewrites the whole file — the payload
/// is two short fields, so atomicity games are not worth their complexity.
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl JsonFileStore {
    /// Open the default store under the platform config directory.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .map(|p| p.join("airband"))
            .ok_or_else(|| {
                PlayerError::Storage("could not determine config directory".to_string())
            })?;
        fs::create_dir_all(&dir)?;
        Self::open(dir.join(STATE_FILE))
    }

    /// Open a store at an explicit path. A missing or corrupt file is
    /// treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Typed view over the two persisted playback fields.
pub struct PersistedPlaybackState<S> {
    store: S,
}

impl<S: StateStore> PersistedPlaybackState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Last playing channel id, if one was recorded and parses.
    pub fn last_channel(&self) -> Option<ChannelId> {
        self.store
            .get(KEY_LAST_CHANNEL)?
            .parse::<u32>()
            .ok()
            .map(ChannelId)
    }

    /// Whether the user explicitly stopped playback (as opposed to pausing).
    pub fn stopped_by_user(&self) -> bool {
        self.store.get(KEY_STOPPED_BY_USER).as_deref() == Some("true")
    }

    pub fn set_last_channel(&mut self, id: ChannelId) -> Result<()> {
        self.store.set(KEY_LAST_CHANNEL, &id.0.to_string())
    }

    pub fn set_stopped_by_user(&mut self, stopped: bool) -> Result<()> {
        self.store
            .set(KEY_STOPPED_BY_USER, if stopped { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- MemoryStore ---

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    // --- JsonFileStore ---

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playback.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set(KEY_LAST_CHANNEL, "7").unwrap();
        store.set(KEY_STOPPED_BY_USER, "false").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(KEY_LAST_CHANNEL).as_deref(), Some("7"));
        assert_eq!(reopened.get(KEY_STOPPED_BY_USER).as_deref(), Some("false"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get(KEY_LAST_CHANNEL), None);
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playback.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(KEY_LAST_CHANNEL), None);
    }

    // --- PersistedPlaybackState ---

    #[test]
    fn typed_view_roundtrip() {
        let mut state = PersistedPlaybackState::new(MemoryStore::new());
        assert_eq!(state.last_channel(), None);
        assert!(!state.stopped_by_user());

        state.set_last_channel(ChannelId(42)).unwrap();
        state.set_stopped_by_user(true).unwrap();
        assert_eq!(state.last_channel(), Some(ChannelId(42)));
        assert!(state.stopped_by_user());

        state.set_stopped_by_user(false).unwrap();
        assert!(!state.stopped_by_user());
    }

    #[test]
    fn unparseable_channel_id_reads_as_none() {
        let mut store = MemoryStore::new();
        store.set(KEY_LAST_CHANNEL, "not-a-number").unwrap();
        let state = PersistedPlaybackState::new(store);
        assert_eq!(state.last_channel(), None);
    }

    #[test]
    fn flag_values_are_true_false_strings() {
        let mut state = PersistedPlaybackState::new(MemoryStore::new());
        state.set_stopped_by_user(true).unwrap();
        // The on-disk contract is the literal strings "true"/"false".
        let store = &state.store;
        assert_eq!(store.get(KEY_STOPPED_BY_USER).as_deref(), Some("true"));
    }
}
