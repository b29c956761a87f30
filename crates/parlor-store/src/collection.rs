//! Whole-file JSON collection persistence.
//!
//! A collection is one pretty-printed UTF-8 document of the shape
//! `{"<key>": [record, ...]}` that is read whole and rewritten whole.
//! `load` degrades gracefully (missing or malformed file yields an empty
//! collection); `save` refuses to touch the file when any record fails
//! validation, leaving prior state intact.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// A record persisted inside a JSON collection document.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Top-level key of the collection document.
    const KEY: &'static str;

    fn id(&self) -> u64;

    /// Check identifying fields before persistence.
    fn validate(&self) -> std::result::Result<(), String>;
}

/// One JSON-backed collection with whole-file replace semantics.
///
/// The writer lock serializes every load-mutate-save sequence on the
/// collection; callers hold the guard from before `load` until after
/// `save`, so concurrent mutations of unrelated records can no longer
/// overwrite each other (the lost-update hazard of last-save-wins).
pub struct JsonCollection<T> {
    path: PathBuf,
    writer: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: Record> JsonCollection<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the writer guard. Hold it across load→mutate→save.
    pub async fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Read the collection. Missing file or malformed content yields an
    /// empty collection; entries failing per-record validation are skipped.
    pub async fn load(&self) -> Vec<T> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        let document: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed collection file");
                return Vec::new();
            }
        };

        let Some(entries) = document.get(T::KEY).and_then(|v| v.as_array()) else {
            warn!(path = %self.path.display(), key = T::KEY, "Collection key missing or not a list");
            return Vec::new();
        };

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<T>(entry.clone()) {
                Ok(record) => match record.validate() {
                    Ok(()) => records.push(record),
                    Err(reason) => {
                        warn!(key = T::KEY, reason, "Skipping invalid record");
                    }
                },
                Err(e) => {
                    warn!(key = T::KEY, error = %e, "Skipping undecodable record");
                }
            }
        }
        records
    }

    /// Validate and persist the whole collection, replacing prior content.
    pub async fn save(&self, records: &[T]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for record in records {
            if record.id() == 0 {
                return Err(StoreError::InvalidCollection(format!(
                    "{} record without a well-formed id",
                    T::KEY
                )));
            }
            if !seen.insert(record.id()) {
                return Err(StoreError::InvalidCollection(format!(
                    "duplicate {} id {}",
                    T::KEY,
                    record.id()
                )));
            }
            record
                .validate()
                .map_err(StoreError::InvalidCollection)?;
        }

        let mut document = serde_json::Map::new();
        document.insert(T::KEY.to_string(), serde_json::to_value(records)?);
        let body = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, body).await?;

        debug!(path = %self.path.display(), count = records.len(), "Collection saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u64,
        name: String,
    }

    impl Record for Item {
        const KEY: &'static str = "items";

        fn id(&self) -> u64 {
            self.id
        }

        fn validate(&self) -> std::result::Result<(), String> {
            if self.name.is_empty() {
                return Err("empty name".to_string());
            }
            Ok(())
        }
    }

    fn collection(dir: &TempDir) -> JsonCollection<Item> {
        JsonCollection::new(dir.path().join("items.json"))
    }

    #[tokio::test]
    async fn test_round_trip_preserves_records() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);

        let items = vec![
            Item { id: 1, name: "première".to_string() },
            Item { id: 2, name: "second".to_string() },
        ];
        coll.save(&items).await.unwrap();

        assert_eq!(coll.load().await, items);
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);
        assert!(coll.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);
        std::fs::write(coll.path(), b"{not json").unwrap();
        assert!(coll.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped_on_load() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);
        std::fs::write(
            coll.path(),
            br#"{"items": [{"id": 1, "name": "ok"}, {"id": 2, "name": ""}, "junk"]}"#,
        )
        .unwrap();

        let items = coll.load().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
    }

    #[tokio::test]
    async fn test_invalid_save_leaves_prior_state_intact() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);

        let good = vec![Item { id: 1, name: "keep".to_string() }];
        coll.save(&good).await.unwrap();

        let bad = vec![Item { id: 1, name: String::new() }];
        assert!(coll.save(&bad).await.is_err());

        assert_eq!(coll.load().await, good);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);

        let dup = vec![
            Item { id: 1, name: "a".to_string() },
            Item { id: 1, name: "b".to_string() },
        ];
        assert!(matches!(
            coll.save(&dup).await,
            Err(StoreError::InvalidCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_id_rejected() {
        let dir = TempDir::new().unwrap();
        let coll = collection(&dir);
        let bad = vec![Item { id: 0, name: "a".to_string() }];
        assert!(coll.save(&bad).await.is_err());
    }
}
