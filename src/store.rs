use crate::db;
use anyhow::Context;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// String-keyed JSON store over the workspace database.
///
/// Reads and writes never fail from the caller's point of view: a value that
/// cannot be read or decoded is logged and reported as absent, and a failed
/// write is logged and dropped.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match db::kv_get(&self.conn, key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read store entry");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to decode store entry");
                None
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode store entry");
                return;
            }
        };
        match db::kv_set(&self.conn, key, &raw) {
            Ok(()) => tracing::debug!(key, bytes = raw.len(), "saved store entry"),
            Err(e) => tracing::warn!(key, error = %e, "failed to write store entry"),
        }
    }

    /// Writes several entries in one transaction so readers never observe a
    /// partial update.
    pub fn save_many(&self, entries: &[(&str, serde_json::Value)]) {
        if let Err(e) = self.try_save_many(entries) {
            let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
            tracing::warn!(?keys, error = %e, "failed to write store entries");
        }
    }

    fn try_save_many(&self, entries: &[(&str, serde_json::Value)]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            let raw = serde_json::to_string(value)?;
            db::kv_set(&tx, key, &raw).with_context(|| format!("write {}", key))?;
        }
        tx.commit()?;
        tracing::debug!(count = entries.len(), "saved store entries");
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = db::kv_remove(&self.conn, key) {
            tracing::warn!(key, error = %e, "failed to remove store entry");
        }
    }

    /// Raw dump of every entry, ordered by key.
    pub fn entries(&self) -> anyhow::Result<Vec<(String, String)>> {
        db::kv_entries(&self.conn).context("failed to list store entries")
    }

    /// Replaces the whole store with `entries` in one transaction.
    pub fn replace_all(&self, entries: &[(String, String)]) -> anyhow::Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin store replace")?;
        tx.execute("DELETE FROM kv_entries", [])
            .context("failed to clear store")?;
        for (key, value) in entries {
            db::kv_set(&tx, key, value).with_context(|| format!("failed to restore {}", key))?;
        }
        tx.commit().context("failed to commit store replace")?;
        Ok(())
    }

    pub fn data_version(&self) -> Option<i64> {
        match db::data_version(&self.conn) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read data_version");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, raw: &str) {
        db::kv_set(&self.conn, key, raw).expect("put raw entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KvStore {
        KvStore::new(db::open_in_memory().expect("open store"))
    }

    #[test]
    fn missing_key_loads_as_absent() {
        let s = store();
        assert_eq!(s.load::<Vec<String>>("checkboards"), None);
    }

    #[test]
    fn corrupt_value_loads_as_absent() {
        let s = store();
        s.put_raw("classrooms", "{not json");
        assert_eq!(s.load::<Vec<String>>("classrooms"), None);
    }

    #[test]
    fn wrong_shape_loads_as_absent() {
        let s = store();
        s.save("mainClassroomId", &42);
        assert_eq!(s.load::<String>("mainClassroomId"), None);
    }

    #[test]
    fn save_many_writes_every_entry() {
        let s = store();
        s.save_many(&[
            ("a", serde_json::json!(["x"])),
            ("b", serde_json::json!("y")),
        ]);
        assert_eq!(s.load::<Vec<String>>("a"), Some(vec!["x".to_string()]));
        assert_eq!(s.load::<String>("b").as_deref(), Some("y"));
    }

    #[test]
    fn replace_all_drops_previous_entries() {
        let s = store();
        s.save("old", &1);
        s.replace_all(&[("new".to_string(), "2".to_string())])
            .expect("replace");
        assert_eq!(s.load::<i64>("old"), None);
        assert_eq!(s.load::<i64>("new"), Some(2));
    }
}
