use super::StorageError;

/// Readable storage traits.
pub trait ReadableStorageTraits<K, V>: Send + Sync {
    /// Retrieve the value associated with `key`.
    ///
    /// Returns [`None`] if the key is not found.
    /// Stores with a lenient read policy also return [`None`] if the stored value cannot be decoded.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &K) -> Result<Option<V>, StorageError>;

    /// Returns true if the store holds an entry for `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Listable storage traits.
///
/// These methods visit every entry in the store.
pub trait ListableStorageTraits<K, V>: Send + Sync {
    /// Return the number of entries in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn size(&self) -> Result<usize, StorageError>;

    /// Returns true if the store has no entries.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.size()? == 0)
    }

    /// Returns true if at least one entry holds `value`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn contains_value(&self, value: &V) -> Result<bool, StorageError>;

    /// Retrieve a snapshot of all keys in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn keys(&self) -> Result<Vec<K>, StorageError>;

    /// Retrieve a snapshot of all values in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn values(&self) -> Result<Vec<V>, StorageError>;

    /// Retrieve a snapshot of all entries in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn entries(&self) -> Result<Vec<(K, V)>, StorageError>;
}

/// Writable storage traits.
pub trait WritableStorageTraits<K, V>: Send + Sync {
    /// Store `value` at `key`, replacing any existing value.
    ///
    /// Returns the previous value, or [`None`] if there was no entry for `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError>;

    /// Erase the entry at `key`.
    ///
    /// Returns the removed value, or [`None`] if there was no entry for `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn remove(&self, key: &K) -> Result<Option<V>, StorageError>;

    /// Store every entry of `entries`.
    ///
    /// This is not atomic: if an entry fails to store, the preceding entries remain stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on the first entry that fails to store.
    fn put_all(&self, entries: Vec<(K, V)>) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Erase all entries.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn clear(&self) -> Result<(), StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`] and [`WritableStorageTraits`].
pub trait ReadableWritableStorageTraits<K, V>:
    ReadableStorageTraits<K, V> + WritableStorageTraits<K, V>
{
}

impl<K, V, T> ReadableWritableStorageTraits<K, V> for T where
    T: ReadableStorageTraits<K, V> + WritableStorageTraits<K, V>
{
}

/// A supertrait of [`ReadableStorageTraits`] and [`ListableStorageTraits`].
pub trait ReadableListableStorageTraits<K, V>:
    ReadableStorageTraits<K, V> + ListableStorageTraits<K, V>
{
}

impl<K, V, T> ReadableListableStorageTraits<K, V> for T where
    T: ReadableStorageTraits<K, V> + ListableStorageTraits<K, V>
{
}

/// A supertrait of [`ReadableWritableStorageTraits`] and [`ListableStorageTraits`].
pub trait ReadableWritableListableStorageTraits<K, V>:
    ReadableWritableStorageTraits<K, V> + ListableStorageTraits<K, V>
{
}

impl<K, V, T> ReadableWritableListableStorageTraits<K, V> for T where
    T: ReadableWritableStorageTraits<K, V> + ListableStorageTraits<K, V>
{
}
