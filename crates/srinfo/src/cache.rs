//! In-memory channel → schedule store shared by the engine and its tasks.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use srinfo_proto::{ChannelId, ScheduleEntry};

/// Keyed schedule store. Entries are replaced whole under the write lock, so
/// a reader sees either the old list or the new one. Entries are never
/// removed.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    entries: RwLock<BTreeMap<ChannelId, ScheduleEntry>>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, channel: ChannelId) -> bool {
        self.read(|entries| entries.contains_key(&channel))
    }

    pub fn get(&self, channel: ChannelId) -> Option<ScheduleEntry> {
        self.read(|entries| entries.get(&channel).cloned())
    }

    /// Store `entry` for `channel`, dropping whatever was there.
    pub fn put(&self, channel: ChannelId, entry: ScheduleEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(channel, entry);
    }

    /// Cached channel ids at this instant, ascending. Channels added after the
    /// call are not included.
    pub fn keys(&self) -> Vec<ChannelId> {
        self.read(|entries| entries.keys().copied().collect())
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<ChannelId, ScheduleEntry>) -> T) -> T {
        // Writers only insert a prepared value, so a poisoned map is still whole
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f(&entries)
    }
}
