//! A storage adapter which turns storage errors into panics.

use std::{marker::PhantomData, sync::Arc};

use crate::{ListableStorageTraits, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// The unchecked storage adapter.
///
/// Exposes the operations of the storage traits as infallible methods.
/// A [`StorageError`] from the wrapped store becomes a panic carrying the error message.
///
/// This suits callers that treat a failing store as unrecoverable.
/// Prefer the storage traits directly where failures should be handled.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use stripestore::{store::MemoryStore, StripedStore};
/// # use stripestore::storage_adapter::unchecked::UncheckedStorageAdapter;
/// let store = Arc::new(StripedStore::new(Arc::new(MemoryStore::new())));
/// let map = UncheckedStorageAdapter::new(store);
/// assert_eq!(map.put("key", 1), None);
/// assert_eq!(map.get(&"key"), Some(1));
/// assert_eq!(map.size(), 1);
/// ```
pub struct UncheckedStorageAdapter<K, V, TStorage: ?Sized> {
    storage: Arc<TStorage>,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V, TStorage: ?Sized> core::fmt::Debug for UncheckedStorageAdapter<K, V, TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unchecked")
    }
}

#[track_caller]
fn unwrap_storage<T>(result: Result<T, StorageError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

impl<K, V, TStorage: ?Sized> UncheckedStorageAdapter<K, V, TStorage> {
    /// Create a new unchecked storage adapter.
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        Self {
            storage,
            _entry: PhantomData,
        }
    }

    /// Returns the wrapped storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }
}

impl<K, V, TStorage: ?Sized + ReadableStorageTraits<K, V>> UncheckedStorageAdapter<K, V, TStorage> {
    /// See [`ReadableStorageTraits::get`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn get(&self, key: &K) -> Option<V> {
        unwrap_storage(self.storage.get(key))
    }

    /// See [`ReadableStorageTraits::contains_key`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn contains_key(&self, key: &K) -> bool {
        unwrap_storage(self.storage.contains_key(key))
    }
}

impl<K, V, TStorage: ?Sized + WritableStorageTraits<K, V>> UncheckedStorageAdapter<K, V, TStorage> {
    /// See [`WritableStorageTraits::put`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn put(&self, key: K, value: V) -> Option<V> {
        unwrap_storage(self.storage.put(key, value))
    }

    /// See [`WritableStorageTraits::remove`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn remove(&self, key: &K) -> Option<V> {
        unwrap_storage(self.storage.remove(key))
    }

    /// See [`WritableStorageTraits::put_all`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn put_all(&self, entries: Vec<(K, V)>) {
        unwrap_storage(self.storage.put_all(entries));
    }

    /// See [`WritableStorageTraits::clear`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn clear(&self) {
        unwrap_storage(self.storage.clear());
    }
}

impl<K, V, TStorage: ?Sized + ListableStorageTraits<K, V>> UncheckedStorageAdapter<K, V, TStorage> {
    /// See [`ListableStorageTraits::size`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn size(&self) -> usize {
        unwrap_storage(self.storage.size())
    }

    /// See [`ListableStorageTraits::is_empty`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn is_empty(&self) -> bool {
        unwrap_storage(self.storage.is_empty())
    }

    /// See [`ListableStorageTraits::contains_value`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn contains_value(&self, value: &V) -> bool {
        unwrap_storage(self.storage.contains_value(value))
    }

    /// See [`ListableStorageTraits::keys`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn keys(&self) -> Vec<K> {
        unwrap_storage(self.storage.keys())
    }

    /// See [`ListableStorageTraits::values`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn values(&self) -> Vec<V> {
        unwrap_storage(self.storage.values())
    }

    /// See [`ListableStorageTraits::entries`].
    ///
    /// # Panics
    /// Panics if the wrapped store fails.
    #[track_caller]
    pub fn entries(&self) -> Vec<(K, V)> {
        unwrap_storage(self.storage.entries())
    }
}
