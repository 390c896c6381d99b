#![allow(missing_docs)]

use std::{error::Error, sync::Arc};

use parking_lot::Mutex;
use rayon::prelude::*;
use stripestore::{
    storage_adapter::{
        performance_metrics::PerformanceMetricsStorageAdapter, unchecked::UncheckedStorageAdapter,
        usage_log::UsageLogStorageAdapter,
    },
    store::MemoryStore,
    ListableStorageTraits, LockMode, ReadableStorageTraits, StorageError, StripedStore,
    WritableStorageTraits,
};
use stripestore_filesystem::FilesystemStore;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
#[cfg_attr(miri, ignore)]
fn striped_filesystem_parallel_puts() -> Result<(), Box<dyn Error>> {
    init_logger();
    let path = tempfile::TempDir::new()?;
    let store = StripedStore::new_with_concurrency(Arc::new(FilesystemStore::new(path.path())?), 16);

    (0..200u32)
        .into_par_iter()
        .try_for_each(|i| store.put(i, i * i).map(|_| ()))?;
    assert_eq!(store.size()?, 200);

    (0..200u32).into_par_iter().try_for_each(|i| {
        assert_eq!(store.get(&i)?, Some(i * i));
        Ok::<_, StorageError>(())
    })?;

    let removed = (0..200u32)
        .into_par_iter()
        .filter(|i| i % 2 == 0)
        .map(|i| store.remove(&i))
        .collect::<Result<Vec<_>, _>>()?;
    assert!(removed.iter().all(Option::is_some));
    assert_eq!(store.size()?, 100);
    assert!(!store.contains_key(&0)?);
    assert!(store.contains_key(&1)?);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn striped_filesystem_clear_during_puts() -> Result<(), Box<dyn Error>> {
    init_logger();
    let path = tempfile::TempDir::new()?;
    let store = StripedStore::new_with_concurrency(Arc::new(FilesystemStore::new(path.path())?), 8);

    std::thread::scope(|s| -> Result<(), StorageError> {
        let writer = s.spawn(|| -> Result<(), StorageError> {
            for round in 0..20u64 {
                store.put_all((0..16).map(|i| (i, round)).collect())?;
                if round % 5 == 4 {
                    store.clear()?;
                }
            }
            Ok(())
        });
        let putter = s.spawn(|| -> Result<(), StorageError> {
            for i in 100..160u64 {
                store.put(i, i)?;
            }
            Ok(())
        });

        loop {
            {
                let _guard = store.stripe_locks().lock_all(LockMode::Read);
                let entries = store.storage().entries()?;
                assert_eq!(entries.len(), store.storage().size()?);
                // a batch is never observed half written
                let batch: Vec<_> = entries.iter().filter(|(key, _)| *key < 16).collect();
                assert!(batch.is_empty() || batch.len() == 16);
                assert!(batch.iter().all(|(_, round)| *round == batch[0].1));
            }
            if writer.is_finished() && putter.is_finished() {
                break;
            }
        }
        writer.join().expect("writer panicked")?;
        putter.join().expect("putter panicked")?;
        Ok(())
    })?;

    let size = store.size()?;
    assert_eq!(store.keys()?.len(), size);
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn striped_filesystem_stored_null() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let store = StripedStore::new(Arc::new(FilesystemStore::new(path.path())?));
    store.put("null".to_string(), None::<String>)?;
    assert_eq!(store.get(&"null".to_string())?, Some(None));
    assert!(store.contains_key(&"null".to_string())?);
    assert!(store.contains_value(&None)?);
    Ok(())
}

#[test]
fn striped_adapters_layered() -> Result<(), Box<dyn Error>> {
    let metrics = Arc::new(PerformanceMetricsStorageAdapter::new(Arc::new(
        MemoryStore::new(),
    )));
    let log_writer = Arc::new(Mutex::new(Vec::<u8>::new()));
    let logged = Arc::new(UsageLogStorageAdapter::new(
        metrics.clone(),
        log_writer.clone(),
        String::new,
    ));
    let store = Arc::new(StripedStore::new_with_concurrency(logged, 4));

    (0..32u8)
        .into_par_iter()
        .try_for_each(|i| store.put(i, u32::from(i)).map(|_| ()))?;
    assert_eq!(store.size()?, 32);
    assert_eq!(metrics.writes(), 32);
    assert_eq!(metrics.scans(), 1);

    let log = String::from_utf8(log_writer.lock().clone())?;
    assert_eq!(log.lines().filter(|line| line.starts_with("put(")).count(), 32);
    assert_eq!(log.lines().last(), Some("size() -> Ok(32)"));

    let map = UncheckedStorageAdapter::new(store);
    assert_eq!(map.get(&3), Some(3));
    assert_eq!(map.remove(&3), Some(3));
    assert!(!map.contains_key(&3));
    Ok(())
}
