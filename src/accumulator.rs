//! Process-lifetime registry of in-flight answer content, keyed by the
//! upstream generation identifier.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

/// Ephemeral, keyed, append-only buffers with explicit release.
///
/// Each key has a single owning relay session: that session is the only
/// writer, and the only reader at finalize time. Entries live only for the
/// duration of one streaming session and are never persisted directly, so
/// `release` must be called exactly once per completed or aborted session.
///
/// Entries hold raw bytes: upstream chunk boundaries can split a multi-byte
/// UTF-8 sequence, so text is decoded once over the whole buffer at read
/// time, never per chunk.
#[derive(Default)]
pub struct StreamContentRegistry {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl StreamContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the entry for `key`, creating it on first use.
    /// Appends for a key are concatenated in call order.
    pub fn append(&self, key: &str, chunk: &[u8]) {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        let entry = entries.entry(key.to_string()).or_default();
        entry.extend_from_slice(chunk);
        trace!("Accumulated {} bytes for stream {}", entry.len(), key);
    }

    /// Content accumulated so far, or `None` if no entry exists.
    pub fn read(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("registry lock poisoned");
        entries
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Drop the entry for `key`. Subsequent reads return `None`.
    pub fn release(&self, key: &str) {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        if entries.remove(key).is_none() {
            // normal for a session that ended before its first chunk
            debug!("Released stream content for key {} with no entry", key);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry lock poisoned").len()
    }
}
