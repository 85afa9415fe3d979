//! Typed collections over the key-value store.
//!
//! Every mutation reads the whole collection, applies the change by id and
//! writes the whole collection back. The store assumes a single writer.

mod checkboards;
mod checks;
mod classrooms;

pub use checkboards::CheckboardPatch;

use crate::error::{CoreError, CoreResult};
use crate::model::Classroom;
use crate::store::KvStore;

pub const CLASSROOMS_KEY: &str = "classrooms";
pub const MAIN_CLASSROOM_KEY: &str = "mainClassroomId";
pub const CHECKBOARDS_KEY: &str = "checkboards";

/// Process-wide settings. The main classroom pointer is the single source of
/// truth for every classroom's `is_main` flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub main_classroom_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub data_version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StoreChange)>;

pub struct Repository {
    store: KvStore,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    last_data_version: Option<i64>,
}

impl Repository {
    pub fn new(store: KvStore) -> Self {
        let last_data_version = store.data_version();
        Self {
            store,
            subscribers: Vec::new(),
            next_subscription: 1,
            last_data_version,
        }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn settings(&self) -> Settings {
        let stored: Option<String> = self
            .store
            .load::<String>(MAIN_CLASSROOM_KEY)
            .filter(|id| !id.is_empty());
        let classrooms: Vec<Classroom> = self.store.load(CLASSROOMS_KEY).unwrap_or_default();
        let main_classroom_id = match stored {
            Some(id) => classrooms.iter().any(|c| c.id == id).then_some(id),
            // Stores written before the pointer existed only carry the flag.
            None => classrooms.iter().find(|c| c.is_main).map(|c| c.id.clone()),
        };
        Settings { main_classroom_id }
    }

    pub fn main_classroom_id(&self) -> Option<String> {
        self.settings().main_classroom_id
    }

    /// Writes the classroom collection together with the main pointer. Flags
    /// are rewritten from `main` so the two can never disagree.
    fn flush_classrooms(&self, mut classrooms: Vec<Classroom>, main: Option<String>) {
        let main = main.filter(|id| classrooms.iter().any(|c| &c.id == id));
        for c in classrooms.iter_mut() {
            c.is_main = main.as_deref() == Some(c.id.as_str());
        }
        let classrooms_json = match serde_json::to_value(&classrooms) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode classrooms");
                return;
            }
        };
        self.store.save_many(&[
            (CLASSROOMS_KEY, classrooms_json),
            (
                MAIN_CLASSROOM_KEY,
                serde_json::Value::String(main.unwrap_or_default()),
            ),
        ]);
    }

    /// Registers a callback fired when another process commits to the store.
    pub fn subscribe(&mut self, callback: impl FnMut(&StoreChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    #[allow(dead_code)]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Checks for commits made by other connections since the last poll and
    /// notifies subscribers if there were any.
    pub fn poll_external_changes(&mut self) -> bool {
        let Some(current) = self.store.data_version() else {
            return false;
        };
        if self.last_data_version == Some(current) {
            return false;
        }
        self.last_data_version = Some(current);
        let change = StoreChange {
            data_version: current,
        };
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&change);
        }
        true
    }

    pub fn export_entries(&self) -> CoreResult<Vec<(String, String)>> {
        self.store
            .entries()
            .map_err(|e| CoreError::Storage(format!("{:#}", e)))
    }

    pub fn restore_entries(&mut self, entries: &[(String, String)]) -> CoreResult<()> {
        self.store
            .replace_all(entries)
            .map_err(|e| CoreError::Storage(format!("{:#}", e)))?;
        tracing::info!(count = entries.len(), "store contents replaced");
        Ok(())
    }
}
