//! Channel registry
//!
//! Passive channel → stream-key cache. The UI layer replaces its contents
//! whenever channel metadata loads; the controller only reads it. An unknown
//! id is "absent", not an error — the channel list may simply not have
//! loaded yet.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Identifier of a radio channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared channel → stream-key mapping. Cloning the registry clones a handle
/// to the same underlying map.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<Mutex<HashMap<ChannelId, String>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full mapping with freshly loaded channel data.
    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (ChannelId, String)>,
    {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *map = entries.into_iter().collect();
    }

    /// Current stream key (playlist URL) for a channel, if known.
    pub fn lookup_stream_key(&self, id: ChannelId) -> Option<String> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.is_empty()
    }
}
