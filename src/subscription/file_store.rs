//! # JSON File Subscriber Store
//!
//! Subscribers persisted as a JSON array. Every operation holds an advisory
//! lock on a sidecar `.lock` file (shared for reads, exclusive for writes), so
//! the read-modify-write inside `update_if_status` is atomic across processes.
//! Writes go to a temporary file that is renamed over the original.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::store::{
    compare_and_swap, stamp_expiry_notified, StatusChange, SubscriberFilter, SubscriberStore,
};
use super::subscriber::{Subscriber, SubscriptionStatus};

type Records = BTreeMap<Uuid, Subscriber>;

/// JSON file-backed subscriber store
#[derive(Debug, Clone)]
pub struct JsonFileSubscriberStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileSubscriberStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_name),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock(&self) -> StoreResult<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("Failed to create store directory: {}", e))
                })?;
            }
        }

        OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to open store lock: {}", e)))
    }

    fn load(&self) -> StoreResult<Records> {
        if !self.path.exists() {
            return Ok(Records::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to read store: {}", e)))?;

        if content.trim().is_empty() {
            return Ok(Records::new());
        }

        let subscribers: Vec<Subscriber> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("Failed to parse store: {}", e)))?;

        Ok(subscribers.into_iter().map(|s| (s.user_id, s)).collect())
    }

    fn save(&self, records: &Records) -> StoreResult<()> {
        let subscribers: Vec<&Subscriber> = records.values().collect();
        let content = serde_json::to_string_pretty(&subscribers)
            .map_err(|e| StoreError::Corrupt(format!("Failed to serialize store: {}", e)))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content)
            .map_err(|e| StoreError::Unavailable(format!("Failed to write store: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to replace store: {}", e)))
    }

    fn with_shared<T>(&self, read: impl FnOnce(&Records) -> T) -> StoreResult<T> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock store: {}", e)))?;

        let result = self.load().map(|records| read(&records));
        let _ = FileExt::unlock(&lock);
        result
    }

    /// Run `write` under the exclusive lock; persist when it reports a change
    fn with_exclusive<T>(
        &self,
        write: impl FnOnce(&mut Records) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock store: {}", e)))?;

        let result = self.load().and_then(|mut records| {
            let (value, changed) = write(&mut records)?;
            if changed {
                self.save(&records)?;
            }
            Ok(value)
        });
        let _ = FileExt::unlock(&lock);
        result
    }
}

impl SubscriberStore for JsonFileSubscriberStore {
    fn insert(&self, subscriber: &Subscriber) -> StoreResult<()> {
        self.with_exclusive(|records| {
            if records.contains_key(&subscriber.user_id) {
                return Err(StoreError::AlreadyExists(subscriber.user_id));
            }
            records.insert(subscriber.user_id, subscriber.clone());
            Ok(((), true))
        })
    }

    fn get(&self, user_id: Uuid) -> StoreResult<Option<Subscriber>> {
        self.with_shared(|records| records.get(&user_id).cloned())
    }

    fn select(&self, filter: &SubscriberFilter) -> StoreResult<Vec<Subscriber>> {
        self.with_shared(|records| {
            records
                .values()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect()
        })
    }

    fn update_if_status(
        &self,
        user_id: Uuid,
        expected: SubscriptionStatus,
        change: &StatusChange,
    ) -> StoreResult<bool> {
        self.with_exclusive(|records| {
            let applied = compare_and_swap(records, user_id, expected, change);
            Ok((applied, applied))
        })
    }

    fn mark_expiry_notified(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        self.with_exclusive(|records| {
            let applied = stamp_expiry_notified(records, user_id, at);
            Ok((applied, applied))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSubscriberStore::new(dir.path().join("subscribers.json"));

        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_file_is_corrupt_not_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subscribers.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileSubscriberStore::new(&path);
        assert!(matches!(store.all(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_lock_file_sits_next_to_data() {
        let store = JsonFileSubscriberStore::new("/var/lib/petport/subscribers.json");
        assert_eq!(
            store.lock_path,
            PathBuf::from("/var/lib/petport/subscribers.json.lock")
        );
    }

    #[test]
    fn test_insert_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("subscribers.json");
        let store = JsonFileSubscriberStore::new(&path);

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store
            .insert(&Subscriber::new(Uuid::new_v4(), "n@example.com", now))
            .unwrap();

        assert!(path.exists());
        assert_eq!(store.all().unwrap().len(), 1);
    }
}
