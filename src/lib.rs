//! A lock-striped concurrency layer for fallible key-value stores.
//!
//! A backing store (e.g. a file-per-entry store on a filesystem) implements some of the storage traits:
//!  - [`ReadableStorageTraits`]: `get` and `contains_key`,
//!  - [`WritableStorageTraits`]: `put`, `remove`, `put_all`, and `clear`, and
//!  - [`ListableStorageTraits`]: `size`, `is_empty`, `contains_value`, `keys`, `values`, and `entries`.
//!
//! Every operation is fallible and returns a [`StorageError`] on failure.
//! A missing entry is not an error, it is [`None`].
//!
//! A [`StripedStore`] wraps a backing store and implements the same traits, making the backing store safe to share between threads.
//! It holds a fixed number of reader-writer lock stripes plus a barrier lock (see [`StripeLocks`]):
//!  - per-key operations lock only the stripe of their key, so operations on keys in different stripes proceed in parallel, and
//!  - whole-store operations lock the barrier and then every stripe they touch, so they never observe or produce a partially mutated store.
//!
//! This crate includes an in-memory store ([`store::MemoryStore`]), storage adapters ([`storage_adapter`]), and global configuration ([`config`]).
//! A naive filesystem store is provided by the `stripestore_filesystem` crate.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use stripestore::{
//!     store::MemoryStore, ListableStorageTraits, ReadableStorageTraits, StripedStore,
//!     WritableStorageTraits,
//! };
//!
//! let store = Arc::new(StripedStore::new(Arc::new(MemoryStore::new())));
//! std::thread::scope(|s| {
//!     for thread in 0..4u32 {
//!         let store = store.clone();
//!         s.spawn(move || store.put(thread, thread * 2));
//!     }
//! });
//! assert_eq!(store.size()?, 4);
//! assert_eq!(store.get(&3)?, Some(6));
//! # Ok::<_, stripestore::StorageError>(())
//! ```
//!
//! ## Licence
//! `stripestore` is licensed under either of
//! - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license or <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod storage_adapter;
mod storage_sync;
pub mod store;
mod striped_store;
mod stripe_lock;


use std::sync::Arc;

use thiserror::Error;

pub use self::storage_sync::{
    ListableStorageTraits, ReadableListableStorageTraits, ReadableStorageTraits,
    ReadableWritableListableStorageTraits, ReadableWritableStorageTraits, WritableStorageTraits,
};

pub use self::stripe_lock::{LockMode, StripeGuard, StripeLocks, StripesGuard};
pub use self::striped_store::StripedStore;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage<K, V> = Arc<dyn ReadableStorageTraits<K, V>>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage<K, V> = Arc<dyn WritableStorageTraits<K, V>>;

/// [`Arc`] wrapped readable and writable storage.
pub type ReadableWritableStorage<K, V> = Arc<dyn ReadableWritableStorageTraits<K, V>>;

/// [`Arc`] wrapped readable, writable, and listable storage.
pub type ReadableWritableListableStorage<K, V> =
    Arc<dyn ReadableWritableListableStorageTraits<K, V>>;

/// [`Arc`] wrapped listable storage.
pub type ListableStorage<K, V> = Arc<dyn ListableStorageTraits<K, V>>;

/// [`Arc`] wrapped readable and listable storage.
pub type ReadableListableStorage<K, V> = Arc<dyn ReadableListableStorageTraits<K, V>>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error serialising a key or value to JSON.
    #[error(transparent)]
    InvalidJSON(#[from] serde_json::Error),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
