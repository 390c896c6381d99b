//! A lock-striped concurrent store.

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
    sync::Arc,
};

use crate::{
    config::global_config, ListableStorageTraits, LockMode, ReadableStorageTraits, StorageError,
    StripeLocks, WritableStorageTraits,
};

/// A store which makes a backing store safe to share between threads with lock striping.
///
/// Keys are assigned to one of a fixed number of stripes (the concurrency level).
/// Every per-key operation locks only the stripe of its key, so operations on keys in different stripes never contend.
/// Whole-store operations lock a barrier and then every stripe, so they observe and produce a consistent snapshot.
///
/// | Operation | Lock mode | Scope |
/// |---|---|---|
/// | [`get`](ReadableStorageTraits::get), [`contains_key`](ReadableStorageTraits::contains_key) | read | single stripe |
/// | [`put`](WritableStorageTraits::put), [`remove`](WritableStorageTraits::remove) | write | single stripe |
/// | [`put_all`](WritableStorageTraits::put_all) | write | stripes of the entries |
/// | [`size`](ListableStorageTraits::size), [`is_empty`](ListableStorageTraits::is_empty), [`contains_value`](ListableStorageTraits::contains_value), [`keys`](ListableStorageTraits::keys), [`values`](ListableStorageTraits::values), [`entries`](ListableStorageTraits::entries) | read | all stripes |
/// | [`clear`](WritableStorageTraits::clear) | write | all stripes |
///
/// Results and errors of the backing store are returned unchanged, after the locks are released.
///
/// The backing store is only accessed through the locks of this store.
/// Accessing it directly while the striped store is in use defeats the locking.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use stripestore::{store::MemoryStore, ReadableStorageTraits, StripedStore, WritableStorageTraits, ListableStorageTraits};
/// let store = StripedStore::new_with_concurrency(Arc::new(MemoryStore::new()), 16);
/// assert_eq!(store.put("key".to_string(), 1)?, None);
/// assert_eq!(store.get(&"key".to_string())?, Some(1));
/// assert_eq!(store.size()?, 1);
/// # Ok::<_, stripestore::StorageError>(())
/// ```
pub struct StripedStore<TStorage: ?Sized, S = RandomState> {
    storage: Arc<TStorage>,
    locks: StripeLocks<S>,
}

impl<TStorage: ?Sized, S> core::fmt::Debug for StripedStore<TStorage, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StripedStore")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl<TStorage: ?Sized> StripedStore<TStorage> {
    /// Create a new striped store over `storage` with the global [default concurrency level](crate::config::Config#default-concurrency-level).
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        let concurrency_level = global_config().default_concurrency_level();
        Self::new_with_concurrency(storage, concurrency_level)
    }

    /// Create a new striped store over `storage` with `concurrency_level` stripes.
    ///
    /// A `concurrency_level` of zero is clamped to one.
    #[must_use]
    pub fn new_with_concurrency(storage: Arc<TStorage>, concurrency_level: usize) -> Self {
        Self::new_with_hasher(storage, concurrency_level, RandomState::new())
    }
}

impl<TStorage: ?Sized, S: BuildHasher> StripedStore<TStorage, S> {
    /// Create a new striped store over `storage` with `concurrency_level` stripes, assigning keys to stripes with `hash_builder`.
    ///
    /// A `concurrency_level` of zero is clamped to one.
    pub fn new_with_hasher(storage: Arc<TStorage>, concurrency_level: usize, hash_builder: S) -> Self {
        Self {
            storage,
            locks: StripeLocks::with_hasher(concurrency_level, hash_builder),
        }
    }

    /// Returns the number of stripes.
    #[must_use]
    pub fn concurrency_level(&self) -> usize {
        self.locks.concurrency_level()
    }

    /// Returns the index of the stripe guarding `key`.
    #[must_use]
    pub fn stripe_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        self.locks.stripe_index(key)
    }
}

impl<TStorage: ?Sized, S> StripedStore<TStorage, S> {
    /// Returns the backing store.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }

    /// Returns the lock stripes.
    ///
    /// Holding a guard from these locks while calling a method of this store on the same thread can deadlock.
    #[must_use]
    pub fn stripe_locks(&self) -> &StripeLocks<S> {
        &self.locks
    }
}

impl<K, V, TStorage, S> ReadableStorageTraits<K, V> for StripedStore<TStorage, S>
where
    K: Hash,
    TStorage: ?Sized + ReadableStorageTraits<K, V>,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let _guard = self.locks.lock_key(key, LockMode::Read);
        self.storage.get(key)
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        let _guard = self.locks.lock_key(key, LockMode::Read);
        self.storage.contains_key(key)
    }
}

impl<K, V, TStorage, S> WritableStorageTraits<K, V> for StripedStore<TStorage, S>
where
    K: Hash,
    TStorage: ?Sized + WritableStorageTraits<K, V>,
    S: BuildHasher + Send + Sync,
{
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError> {
        let _guard = self.locks.lock_key(&key, LockMode::Write);
        self.storage.put(key, value)
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StorageError> {
        let _guard = self.locks.lock_key(key, LockMode::Write);
        self.storage.remove(key)
    }

    fn put_all(&self, entries: Vec<(K, V)>) -> Result<(), StorageError> {
        let _guard = self
            .locks
            .lock_subset_write(entries.iter().map(|(key, _)| key));
        self.storage.put_all(entries)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.locks.lock_all(LockMode::Write);
        self.storage.clear()
    }
}

impl<K, V, TStorage, S> ListableStorageTraits<K, V> for StripedStore<TStorage, S>
where
    TStorage: ?Sized + ListableStorageTraits<K, V>,
    S: Send + Sync,
{
    fn size(&self) -> Result<usize, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.size()
    }

    fn is_empty(&self) -> Result<bool, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.is_empty()
    }

    fn contains_value(&self, value: &V) -> Result<bool, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.contains_value(value)
    }

    fn keys(&self) -> Result<Vec<K>, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.keys()
    }

    fn values(&self) -> Result<Vec<V>, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.values()
    }

    fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        let _guard = self.locks.lock_all(LockMode::Read);
        self.storage.entries()
    }
}
