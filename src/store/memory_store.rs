//! An in-memory store.

use std::{collections::HashMap, hash::Hash};

use parking_lot::Mutex;

use crate::{ListableStorageTraits, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// An in-memory store.
///
/// Operations never fail.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    data_map: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V> {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_map: Mutex::default(),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ReadableStorageTraits<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        Ok(self.data_map.lock().get(key).cloned())
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        Ok(self.data_map.lock().contains_key(key))
    }
}

impl<K, V> WritableStorageTraits<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send,
    V: Send,
{
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError> {
        Ok(self.data_map.lock().insert(key, value))
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StorageError> {
        Ok(self.data_map.lock().remove(key))
    }

    fn put_all(&self, entries: Vec<(K, V)>) -> Result<(), StorageError> {
        self.data_map.lock().extend(entries);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.data_map.lock().clear();
        Ok(())
    }
}

impl<K, V> ListableStorageTraits<K, V> for MemoryStore<K, V>
where
    K: Clone + Send,
    V: Clone + PartialEq + Send,
{
    fn size(&self) -> Result<usize, StorageError> {
        Ok(self.data_map.lock().len())
    }

    fn contains_value(&self, value: &V) -> Result<bool, StorageError> {
        Ok(self.data_map.lock().values().any(|v| v == value))
    }

    fn keys(&self) -> Result<Vec<K>, StorageError> {
        Ok(self.data_map.lock().keys().cloned().collect())
    }

    fn values(&self) -> Result<Vec<V>, StorageError> {
        Ok(self.data_map.lock().values().cloned().collect())
    }

    fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        Ok(self
            .data_map
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
