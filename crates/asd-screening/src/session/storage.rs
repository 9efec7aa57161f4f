use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// String key-value storage with the semantics of a browser storage area.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Hands `apply` the current value and stores what it returns, with no other access
    /// to the area in between. `None` leaves the item as it was.
    fn update_item(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("stored value under '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value for '{key}' could not be serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Read and decode a JSON document stored under `key`.
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get_item(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and overwrite whatever was stored under `key`.
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set_item(key, raw)
}

/// Read, change and write back the JSON document under `key` as one step.
///
/// `apply` receives the decoded document (`Err(StorageError::Corrupt)` when it cannot be
/// read) and returns the document to store, if any, along with its result.
pub fn update_json<T, R, E, S, F>(store: &S, key: &str, apply: F) -> Result<R, E>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore + ?Sized,
    E: From<StorageError>,
    F: FnOnce(Result<Option<T>, StorageError>) -> Result<(Option<T>, R), E>,
{
    let mut apply = Some(apply);
    let mut outcome: Option<Result<R, E>> = None;

    store
        .update_item(key, &mut |raw: Option<String>| {
            let apply = apply.take()?;
            let current = match raw {
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|source| StorageError::Corrupt {
                        key: key.to_string(),
                        source,
                    }),
                None => Ok(None),
            };

            match apply(current) {
                Ok((Some(next), result)) => match serde_json::to_string(&next) {
                    Ok(encoded) => {
                        outcome = Some(Ok(result));
                        Some(encoded)
                    }
                    Err(source) => {
                        outcome = Some(Err(E::from(StorageError::Serialize {
                            key: key.to_string(),
                            source,
                        })));
                        None
                    }
                },
                Ok((None, result)) => {
                    outcome = Some(Ok(result));
                    None
                }
                Err(err) => {
                    outcome = Some(Err(err));
                    None
                }
            }
        })
        .map_err(E::from)?;

    outcome.unwrap_or_else(|| {
        Err(E::from(StorageError::Unavailable(format!(
            "update of '{key}' was not applied"
        ))))
    })
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn len(&self) -> usize {
        self.items.lock().expect("storage mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.items.lock().expect("storage mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut guard = self.items.lock().expect("storage mutex poisoned");
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.items.lock().expect("storage mutex poisoned");
        guard.remove(key);
        Ok(())
    }

    fn update_item(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self.items.lock().expect("storage mutex poisoned");
        if let Some(next) = apply(guard.get(key).cloned()) {
            guard.insert(key.to_string(), next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        pinned: bool,
    }

    #[test]
    fn json_helpers_overwrite_previous_value() {
        let store = MemoryKeyValueStore::default();
        let first = Note {
            title: "first".to_string(),
            pinned: false,
        };
        let second = Note {
            title: "second".to_string(),
            pinned: true,
        };

        write_json(&store, "note", &first).expect("write first");
        write_json(&store, "note", &second).expect("write second");

        let stored: Option<Note> = read_json(&store, "note").expect("read back");
        assert_eq!(stored, Some(second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_json_reports_corrupt_values() {
        let store = MemoryKeyValueStore::default();
        store
            .set_item("note", "{not json".to_string())
            .expect("raw write");

        match read_json::<Note, _>(&store, "note") {
            Err(StorageError::Corrupt { key, .. }) => assert_eq!(key, "note"),
            other => panic!("expected corrupt value error, got {other:?}"),
        }
    }

    #[test]
    fn update_json_applies_concurrent_changes_one_at_a_time() {
        let store = MemoryKeyValueStore::default();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        update_json(&store, "count", |current: Result<Option<u32>, _>| {
                            let next = current?.unwrap_or(0) + 1;
                            Ok::<_, StorageError>((Some(next), ()))
                        })
                        .expect("update");
                    }
                });
            }
        });

        let count: Option<u32> = read_json(&store, "count").expect("read back");
        assert_eq!(count, Some(400));
    }

    #[test]
    fn update_json_leaves_item_alone_when_nothing_is_returned() {
        let store = MemoryKeyValueStore::default();
        store
            .set_item("note", "{not json".to_string())
            .expect("raw write");

        let seen_corrupt = update_json(&store, "note", |current: Result<Option<Note>, _>| {
            Ok::<_, StorageError>((None, matches!(current, Err(StorageError::Corrupt { .. }))))
        })
        .expect("update");

        assert!(seen_corrupt);
        assert_eq!(
            store.get_item("note").expect("read"),
            Some("{not json".to_string())
        );
    }

    #[test]
    fn clones_share_the_same_area() {
        let store = MemoryKeyValueStore::default();
        let alias = store.clone();
        alias.set_item("k", "v".to_string()).expect("write");
        assert_eq!(store.get_item("k").expect("read"), Some("v".to_string()));
        store.remove_item("k").expect("remove");
        assert!(alias.is_empty());
    }
}
