//! A storage adapter which prints function calls.

use std::{fmt::Debug, io::Write, sync::Arc};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::{ListableStorageTraits, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// The usage log storage adapter. Logs storage method calls.
///
/// It is intended to aid in debugging by revealing storage access patterns.
/// Keys and values are printed with their [`Debug`] representation.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// # use stripestore::{store::MemoryStore, StripedStore, WritableStorageTraits};
/// # use stripestore::storage_adapter::usage_log::UsageLogStorageAdapter;
/// let store = Arc::new(StripedStore::new(Arc::new(MemoryStore::new())));
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let store = UsageLogStorageAdapter::new(store, log_writer, || "[store] ".to_string());
/// store.put("a", 1)?;
/// # Ok::<_, stripestore::StorageError>(())
/// ```
///
/// Operations through the above [`UsageLogStorageAdapter`] print outputs like:
/// ```text
/// [store] put("a", 1) -> Ok(None)
/// [store] get("a") -> Ok(Some(1))
/// [store] put_all(["b", "c"]) -> Ok(())
/// [store] size() -> Ok(3)
/// [store] keys() -> ["a", "b", "c"]
/// ```
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TStorage: ?Sized> core::fmt::Debug for UsageLogStorageAdapter<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "usage log")
    }
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter.
    pub fn new(
        storage: Arc<TStorage>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            storage,
            handle,
            prefix_func,
        }
    }
}

impl<K, V, TStorage> ReadableStorageTraits<K, V> for UsageLogStorageAdapter<TStorage>
where
    K: Debug,
    V: Debug,
    TStorage: ?Sized + ReadableStorageTraits<K, V>,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let result = self.storage.get(key);
        writeln!(
            self.handle.lock(),
            "{}get({key:?}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        let result = self.storage.contains_key(key);
        writeln!(
            self.handle.lock(),
            "{}contains_key({key:?}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<K, V, TStorage> WritableStorageTraits<K, V> for UsageLogStorageAdapter<TStorage>
where
    K: Debug,
    V: Debug,
    TStorage: ?Sized + WritableStorageTraits<K, V>,
{
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError> {
        let args = format!("{key:?}, {value:?}");
        let result = self.storage.put(key, value);
        writeln!(
            self.handle.lock(),
            "{}put({args}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StorageError> {
        let result = self.storage.remove(key);
        writeln!(
            self.handle.lock(),
            "{}remove({key:?}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn put_all(&self, entries: Vec<(K, V)>) -> Result<(), StorageError> {
        let keys = format!(
            "{:?}",
            entries.iter().map(|(key, _)| key).format(", ")
        );
        let result = self.storage.put_all(entries);
        writeln!(
            self.handle.lock(),
            "{}put_all([{keys}]) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn clear(&self) -> Result<(), StorageError> {
        let result = self.storage.clear();
        writeln!(
            self.handle.lock(),
            "{}clear() -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<K, V, TStorage> ListableStorageTraits<K, V> for UsageLogStorageAdapter<TStorage>
where
    K: Debug,
    V: Debug,
    TStorage: ?Sized + ListableStorageTraits<K, V>,
{
    fn size(&self) -> Result<usize, StorageError> {
        let result = self.storage.size();
        writeln!(
            self.handle.lock(),
            "{}size() -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn is_empty(&self) -> Result<bool, StorageError> {
        let result = self.storage.is_empty();
        writeln!(
            self.handle.lock(),
            "{}is_empty() -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn contains_value(&self, value: &V) -> Result<bool, StorageError> {
        let result = self.storage.contains_value(value);
        writeln!(
            self.handle.lock(),
            "{}contains_value({value:?}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn keys(&self) -> Result<Vec<K>, StorageError> {
        let result = self.storage.keys();
        writeln!(
            self.handle.lock(),
            "{}keys() -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn values(&self) -> Result<Vec<V>, StorageError> {
        let result = self.storage.values();
        writeln!(
            self.handle.lock(),
            "{}values() -> len={:?}",
            (self.prefix_func)(),
            result.as_ref().map(Vec::len)
        )?;
        result
    }

    fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        let result = self.storage.entries();
        writeln!(
            self.handle.lock(),
            "{}entries() -> len={:?}",
            (self.prefix_func)(),
            result.as_ref().map(Vec::len)
        )?;
        result
    }
}
