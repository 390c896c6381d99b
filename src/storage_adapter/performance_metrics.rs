//! A storage adapter which records performance metrics.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{ListableStorageTraits, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// The performance metrics storage adapter. Accumulates operation counts.
///
/// It is intended to aid in testing by allowing the application to validate that metrics (e.g., total reads, writes, and scans) match expected values for specific operations.
/// Counts include failed operations.
#[derive(Debug)]
pub struct PerformanceMetricsStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    scans: AtomicUsize,
}

impl<TStorage: ?Sized> PerformanceMetricsStorageAdapter<TStorage> {
    /// Create a new performance metrics storage adapter.
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        Self {
            storage,
            reads: AtomicUsize::default(),
            writes: AtomicUsize::default(),
            scans: AtomicUsize::default(),
        }
    }

    /// Returns the number of per-key read requests (`get`, `contains_key`).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of entries written or removed.
    ///
    /// `put_all` counts one write per entry, `clear` counts one.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of whole-store read requests (`size`, `contains_value`, `keys`, ...).
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}

impl<K, V, TStorage> ReadableStorageTraits<K, V> for PerformanceMetricsStorageAdapter<TStorage>
where
    TStorage: ?Sized + ReadableStorageTraits<K, V>,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.storage.get(key)
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.storage.contains_key(key)
    }
}

impl<K, V, TStorage> WritableStorageTraits<K, V> for PerformanceMetricsStorageAdapter<TStorage>
where
    TStorage: ?Sized + WritableStorageTraits<K, V>,
{
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.put(key, value)
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.remove(key)
    }

    fn put_all(&self, entries: Vec<(K, V)>) -> Result<(), StorageError> {
        self.writes.fetch_add(entries.len(), Ordering::Relaxed);
        self.storage.put_all(entries)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.clear()
    }
}

impl<K, V, TStorage> ListableStorageTraits<K, V> for PerformanceMetricsStorageAdapter<TStorage>
where
    TStorage: ?Sized + ListableStorageTraits<K, V>,
{
    fn size(&self) -> Result<usize, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.size()
    }

    fn is_empty(&self) -> Result<bool, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.is_empty()
    }

    fn contains_value(&self, value: &V) -> Result<bool, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.contains_value(value)
    }

    fn keys(&self) -> Result<Vec<K>, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.keys()
    }

    fn values(&self) -> Result<Vec<V>, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.values()
    }

    fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.storage.entries()
    }
}
