use super::Repository;
use crate::model::{DayKey, SnapshotEntry};

impl Repository {
    /// Live check set for one day; empty if nothing was written yet.
    pub fn load_live_checks(&self, key: &DayKey) -> Vec<String> {
        self.store.load(&key.live_key()).unwrap_or_default()
    }

    pub fn save_live_checks(&self, key: &DayKey, checked: &[String]) {
        self.store.save(&key.live_key(), checked);
    }

    pub fn load_snapshots(&self, key: &DayKey) -> Vec<SnapshotEntry> {
        self.store.load(&key.snapshots_key()).unwrap_or_default()
    }

    pub fn save_snapshots(&self, key: &DayKey, snapshots: &[SnapshotEntry]) {
        self.store.save(&key.snapshots_key(), snapshots);
    }
}
