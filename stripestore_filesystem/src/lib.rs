//! A naive file-per-entry store for the [`stripestore`](https://docs.rs/stripestore/latest/stripestore/index.html) crate.
//!
//! Each entry is a file in `<base_path>/data` named by the decimal hash of its key.
//! The file holds the entry serialised as JSON:
//! ```json
//! {"key":"a","value":1}
//! ```
//!
//! The store does no locking of its own.
//! Wrap it in a [`StripedStore`](stripestore::StripedStore) to share it between threads.
//!
//! ## Hash collisions
//! Keys with equal hashes share a file, so the last write wins.
//! A [`get`](ReadableStorageTraits::get) returns whatever entry occupies the file of the key, even if it was written under another key.
//!
//! ## Licence
//! `stripestore_filesystem` is licensed under either of
//! - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

use stripestore::{
    ListableStorageTraits, ReadableStorageTraits, StorageError, WritableStorageTraits,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use std::{
    fs::File,
    hash::{BuildHasher, BuildHasherDefault, DefaultHasher, Hash},
    io::{BufReader, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

/// The name of the directory holding entry files, relative to the base path.
const DATA_DIRECTORY: &str = "data";

#[derive(Deserialize)]
struct Entry<K, V> {
    key: K,
    value: V,
}

#[derive(Serialize)]
struct EntryRef<'a, K, V> {
    key: &'a K,
    value: &'a V,
}

/// A synchronous file-per-entry store.
///
/// Unreadable or corrupt entry files read as absent.
///
/// The default hasher ([`DefaultHasher`]) is deterministic within one Rust toolchain, so a store reopened at the same path finds its entries.
/// Its algorithm may change between Rust releases, which leaves entries written by another toolchain unreachable by key.
/// Use [`FilesystemStore::new_with_hasher`] with a hasher of stable output for stores that outlive a toolchain.
pub struct FilesystemStore<K, V, S = BuildHasherDefault<DefaultHasher>> {
    data_path: PathBuf,
    readonly: bool,
    hash_builder: S,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> core::fmt::Debug for FilesystemStore<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilesystemStore")
            .field("data_path", &self.data_path)
            .field("readonly", &self.readonly)
            .finish_non_exhaustive()
    }
}

impl<K, V> FilesystemStore<K, V> {
    /// Create a new file system store at a given `base_path`.
    ///
    /// Entries are stored in `<base_path>/data`, which is created if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path`:
    ///   - is not valid, or
    ///   - the data directory cannot be created.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        Self::new_with_hasher(base_path, BuildHasherDefault::default())
    }
}

impl<K, V, S> FilesystemStore<K, V, S> {
    /// Create a new file system store at a given `base_path` naming entry files with `hash_builder`.
    ///
    /// The hasher must produce the same output across processes for entries to be found after reopening the store.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path`:
    ///   - is not valid, or
    ///   - the data directory cannot be created.
    pub fn new_with_hasher<P: AsRef<Path>>(
        base_path: P,
        hash_builder: S,
    ) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let data_path = base_path.join(DATA_DIRECTORY);
        std::fs::create_dir_all(&data_path)?;
        let readonly = std::fs::metadata(&data_path)?.permissions().readonly();
        log::debug!(
            "opened filesystem store at {} (readonly: {readonly})",
            data_path.display()
        );

        Ok(Self {
            data_path,
            readonly,
            hash_builder,
            _entry: PhantomData,
        })
    }

    /// Returns the directory holding the entry files.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Returns true if the data directory is read only.
    #[must_use]
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.readonly {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Returns the paths of all entry files, sorted by file name.
    fn entry_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut paths = vec![];
        for entry in WalkDir::new(&self.data_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

impl<K, V, S: BuildHasher> FilesystemStore<K, V, S> {
    /// Maps a key to the path of its entry file.
    #[must_use]
    pub fn key_to_fspath(&self, key: &K) -> PathBuf
    where
        K: Hash,
    {
        self.data_path
            .join(self.hash_builder.hash_one(key).to_string())
    }
}

impl<K: DeserializeOwned, V: DeserializeOwned, S> FilesystemStore<K, V, S> {
    /// Read the entry in the file at `path`.
    ///
    /// A missing file or content that does not deserialise is [`None`].
    fn read_entry(path: &Path) -> Result<Option<(K, V)>, StorageError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_reader::<_, Entry<K, V>>(BufReader::new(file)) {
            Ok(Entry { key, value }) => Ok(Some((key, value))),
            Err(err) if err.is_io() => Err(StorageError::IOError(err.into())),
            Err(err) => {
                log::warn!("skipping unreadable entry {}: {err}", path.display());
                Ok(None)
            }
        }
    }

    fn read_entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        let mut entries = vec![];
        for path in self.entry_paths()? {
            if let Some(entry) = Self::read_entry(&path)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn write_entry<K: Serialize, V: Serialize>(
    path: &Path,
    key: &K,
    value: &V,
) -> Result<(), StorageError> {
    // serialise before truncating, so a failure leaves the existing entry intact
    let bytes = serde_json::to_vec(&EntryRef { key, value })?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

impl<K, V, S> ReadableStorageTraits<K, V> for FilesystemStore<K, V, S>
where
    K: Hash + DeserializeOwned,
    V: DeserializeOwned,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        Ok(Self::read_entry(&self.key_to_fspath(key))?.map(|(_, value)| value))
    }

    fn contains_key(&self, key: &K) -> Result<bool, StorageError> {
        Ok(Self::read_entry(&self.key_to_fspath(key))?.is_some())
    }
}

impl<K, V, S> WritableStorageTraits<K, V> for FilesystemStore<K, V, S>
where
    K: Hash + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: BuildHasher + Send + Sync,
{
    fn put(&self, key: K, value: V) -> Result<Option<V>, StorageError> {
        self.check_writable()?;
        let previous = self.get(&key)?;
        write_entry(&self.key_to_fspath(&key), &key, &value)?;
        Ok(previous)
    }

    fn remove(&self, key: &K) -> Result<Option<V>, StorageError> {
        self.check_writable()?;
        let previous = self.get(key)?;
        match std::fs::remove_file(self.key_to_fspath(key)) {
            Ok(()) => Ok(previous),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(previous),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        for path in self.entry_paths()? {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl<K, V, S> ListableStorageTraits<K, V> for FilesystemStore<K, V, S>
where
    K: DeserializeOwned,
    V: DeserializeOwned + PartialEq,
    S: Send + Sync,
{
    fn size(&self) -> Result<usize, StorageError> {
        Ok(self.entry_paths()?.len())
    }

    fn contains_value(&self, value: &V) -> Result<bool, StorageError> {
        for path in self.entry_paths()? {
            if let Some((_, entry_value)) = Self::read_entry(&path)? {
                if entry_value == *value {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn keys(&self) -> Result<Vec<K>, StorageError> {
        Ok(self.read_entries()?.into_iter().map(|(key, _)| key).collect())
    }

    fn values(&self) -> Result<Vec<V>, StorageError> {
        Ok(self
            .read_entries()?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    fn entries(&self) -> Result<Vec<(K, V)>, StorageError> {
        self.read_entries()
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}
