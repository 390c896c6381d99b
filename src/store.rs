//! Backing stores.
//!
//! This crate includes an in-memory store.
//! The `stripestore_filesystem` crate implements a naive file-per-entry store.

mod memory_store;

pub use memory_store::MemoryStore;
