//! Lock stripes guarding a store.
//!
//! A [`StripeLocks`] holds a fixed array of reader-writer locks (stripes) and one barrier lock.
//! Each key maps to exactly one stripe through the hash of the key modulo the number of stripes.
//!
//! Per-key operations lock the stripe of their key with [`StripeLocks::lock_key`] and never touch the barrier.
//! Whole-store operations lock the barrier first and then acquire every stripe they need with a non-blocking sweep ([`StripeLocks::lock_all`], [`StripeLocks::lock_subset_write`]).
//! A thread never blocks while holding a stripe, so no circular wait can form among stripes, and whole-store operations are serialised on the barrier.
//!
//! ### Re-entrancy
//! Locks are not re-entrant.
//! A thread holding a [`StripesGuard`] or [`StripeGuard`] must not acquire another guard from the same [`StripeLocks`] (e.g. by calling a [`StripedStore`](crate::StripedStore) method), this can deadlock.

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
};

use derive_more::Display;
use itertools::Itertools;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::global_config;

/// The mode a lock is acquired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LockMode {
    /// Shared access, any number of readers.
    #[display("read")]
    Read,
    /// Exclusive access, a single writer.
    #[display("write")]
    Write,
}

#[derive(Debug)]
enum RawGuard<'a> {
    Read(RwLockReadGuard<'a, ()>),
    Write(RwLockWriteGuard<'a, ()>),
}

impl<'a> RawGuard<'a> {
    fn lock(lock: &'a RwLock<()>, mode: LockMode) -> Self {
        match mode {
            LockMode::Read => Self::Read(lock.read()),
            LockMode::Write => Self::Write(lock.write()),
        }
    }

    fn try_lock(lock: &'a RwLock<()>, mode: LockMode) -> Option<Self> {
        match mode {
            // Queued writers must not fail a read sweep, otherwise two concurrent read sweeps can wait on each other through the writers parked behind their stripes.
            LockMode::Read => lock.try_read_recursive().map(Self::Read),
            LockMode::Write => lock.try_write().map(Self::Write),
        }
    }

    fn unlock(self, fair: bool) {
        match self {
            Self::Read(guard) if fair => RwLockReadGuard::unlock_fair(guard),
            Self::Write(guard) if fair => RwLockWriteGuard::unlock_fair(guard),
            guard => drop(guard),
        }
    }
}

/// A RAII guard holding a single stripe. The stripe is unlocked when the guard is dropped.
#[derive(Debug)]
#[must_use = "the stripe is unlocked immediately if the guard is not held"]
pub struct StripeGuard<'a> {
    index: usize,
    mode: LockMode,
    fair: bool,
    guard: Option<RawGuard<'a>>,
}

impl StripeGuard<'_> {
    /// Returns the index of the held stripe.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the mode the stripe is held in.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for StripeGuard<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.unlock(self.fair);
        }
    }
}

/// A RAII guard holding the barrier and a set of stripes.
///
/// On drop, every stripe is released before the barrier.
#[derive(Debug)]
#[must_use = "the stripes are unlocked immediately if the guard is not held"]
pub struct StripesGuard<'a> {
    mode: LockMode,
    fair: bool,
    stripes: Vec<(usize, RawGuard<'a>)>,
    barrier: Option<RawGuard<'a>>,
}

impl StripesGuard<'_> {
    /// Returns the mode the barrier and stripes are held in.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Returns the sorted indices of the held stripes.
    #[must_use]
    pub fn stripe_indices(&self) -> Vec<usize> {
        self.stripes.iter().map(|(index, _)| *index).sorted_unstable().collect()
    }
}

impl Drop for StripesGuard<'_> {
    fn drop(&mut self) {
        for (_, guard) in self.stripes.drain(..) {
            guard.unlock(self.fair);
        }
        if let Some(barrier) = self.barrier.take() {
            barrier.unlock(self.fair);
        }
    }
}

/// A fixed set of lock stripes and a barrier lock.
///
/// The number of stripes (the concurrency level) is fixed at construction.
/// Stripe assignment uses the hasher `S`, so a key maps to the same stripe for the lifetime of the instance.
pub struct StripeLocks<S = RandomState> {
    stripes: Box<[RwLock<()>]>,
    barrier: RwLock<()>,
    hash_builder: S,
    fair: bool,
}

impl<S> core::fmt::Debug for StripeLocks<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StripeLocks")
            .field("concurrency_level", &self.stripes.len())
            .field("fair", &self.fair)
            .finish_non_exhaustive()
    }
}

impl StripeLocks {
    /// Create `concurrency_level` lock stripes with a randomly seeded hasher.
    ///
    /// A `concurrency_level` of zero is clamped to one.
    #[must_use]
    pub fn new(concurrency_level: usize) -> Self {
        Self::with_hasher(concurrency_level, RandomState::new())
    }
}

impl<S: BuildHasher> StripeLocks<S> {
    /// Create `concurrency_level` lock stripes which assign keys to stripes with `hash_builder`.
    ///
    /// A `concurrency_level` of zero is clamped to one.
    /// Stripes are unlocked fairly if the global [fair unlock](crate::config::Config#fair-unlock) option is enabled.
    pub fn with_hasher(concurrency_level: usize, hash_builder: S) -> Self {
        let concurrency_level = if concurrency_level < 1 {
            log::warn!("concurrency level {concurrency_level} is invalid, using 1");
            1
        } else {
            concurrency_level
        };
        let fair = global_config().fair_unlock();
        log::debug!("creating {concurrency_level} lock stripes (fair unlock: {fair})");
        Self {
            stripes: (0..concurrency_level).map(|_| RwLock::new(())).collect(),
            barrier: RwLock::new(()),
            hash_builder,
            fair,
        }
    }

    /// Returns the index of the stripe guarding `key`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn stripe_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        // the remainder is below the stripe count, which is a usize
        (self.hash_builder.hash_one(key) % self.stripes.len() as u64) as usize
    }

    /// Lock the stripe guarding `key` in `mode`, blocking the current thread until it can be acquired.
    ///
    /// The barrier is not touched.
    pub fn lock_key<K: Hash + ?Sized>(&self, key: &K, mode: LockMode) -> StripeGuard<'_> {
        let index = self.stripe_index(key);
        StripeGuard {
            index,
            mode,
            fair: self.fair,
            guard: Some(RawGuard::lock(&self.stripes[index], mode)),
        }
    }

    /// Lock the barrier and then the stripes guarding `keys` for writing.
    ///
    /// Stripes which guard none of `keys` are left unlocked.
    pub fn lock_subset_write<'k, K: Hash + ?Sized + 'k>(
        &self,
        keys: impl IntoIterator<Item = &'k K>,
    ) -> StripesGuard<'_> {
        let needed = keys
            .into_iter()
            .map(|key| self.stripe_index(key))
            .sorted_unstable()
            .dedup()
            .collect();
        self.lock_stripes(needed, LockMode::Write)
    }
}

impl<S> StripeLocks<S> {
    /// Returns the number of stripes.
    #[must_use]
    pub fn concurrency_level(&self) -> usize {
        self.stripes.len()
    }

    /// Lock the barrier and then every stripe in `mode`.
    ///
    /// Blocks until the barrier is acquired, then polls the stripes until all are held.
    pub fn lock_all(&self, mode: LockMode) -> StripesGuard<'_> {
        self.lock_stripes((0..self.stripes.len()).collect(), mode)
    }

    fn lock_stripes(&self, mut needed: Vec<usize>, mode: LockMode) -> StripesGuard<'_> {
        let barrier = RawGuard::lock(&self.barrier, mode);

        let mut stripes = Vec::with_capacity(needed.len());
        let mut sweeps = 0usize;
        loop {
            needed.retain(
                |&index| match RawGuard::try_lock(&self.stripes[index], mode) {
                    Some(guard) => {
                        stripes.push((index, guard));
                        false
                    }
                    None => true,
                },
            );
            if needed.is_empty() {
                break;
            }
            sweeps += 1;
            log::trace!(
                "{mode} sweep {sweeps}: {} of {} stripes busy",
                needed.len(),
                needed.len() + stripes.len()
            );
            std::thread::yield_now();
        }

        StripesGuard {
            mode,
            fair: self.fair,
            stripes,
            barrier: Some(barrier),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        hash::{BuildHasherDefault, Hasher},
        sync::mpsc,
        time::Duration,
    };

    use super::*;

    const BLOCKED: Duration = Duration::from_millis(100);
    const UNBLOCKED: Duration = Duration::from_secs(10);

    /// Hashes integers to themselves.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for byte in bytes {
                self.0 = (self.0 << 8) | u64::from(*byte);
            }
        }

        fn write_u64(&mut self, i: u64) {
            self.0 = i;
        }
    }

    type IdentityState = BuildHasherDefault<IdentityHasher>;

    fn identity_locks(concurrency_level: usize) -> StripeLocks<IdentityState> {
        StripeLocks::with_hasher(concurrency_level, IdentityState::default())
    }

    #[test]
    fn stripe_locks_clamp() {
        let locks = StripeLocks::new(0);
        assert_eq!(locks.concurrency_level(), 1);
        assert_eq!(locks.stripe_index("a"), 0);
        assert_eq!(locks.stripe_index("b"), 0);
        let guard = locks.lock_all(LockMode::Write);
        assert_eq!(guard.stripe_indices(), vec![0]);
    }

    #[test]
    fn stripe_index() {
        let locks = identity_locks(4);
        assert_eq!(locks.concurrency_level(), 4);
        assert_eq!(locks.stripe_index(&0u64), 0);
        assert_eq!(locks.stripe_index(&5u64), 1);
        assert_eq!(locks.stripe_index(&7u64), 3);
        assert_eq!(locks.stripe_index(&8u64), 0);

        let locks = StripeLocks::new(16);
        for key in ["a", "b", "abc"] {
            let index = locks.stripe_index(key);
            assert!(index < 16);
            assert_eq!(locks.stripe_index(key), index);
        }
    }

    #[test]
    fn lock_key_read_shared() {
        let locks = identity_locks(4);
        let a = locks.lock_key(&1u64, LockMode::Read);
        let b = locks.lock_key(&5u64, LockMode::Read);
        assert_eq!(a.index(), b.index());
        assert_eq!(a.mode(), LockMode::Read);
    }

    #[test]
    fn lock_key_write_exclusive() {
        let locks = &identity_locks(4);
        std::thread::scope(|s| {
            let guard = locks.lock_key(&1u64, LockMode::Write);
            let (tx, rx) = mpsc::channel();

            // Same stripe as 1.
            let tx_same = tx.clone();
            s.spawn(move || {
                let _guard = locks.lock_key(&5u64, LockMode::Read);
                tx_same.send(5u64).unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());

            // Another stripe.
            s.spawn(move || {
                let _guard = locks.lock_key(&2u64, LockMode::Write);
                tx.send(2u64).unwrap();
            });
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), 2);

            drop(guard);
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), 5);
        });
    }

    #[test]
    fn lock_all_waits_for_key() {
        let locks = &identity_locks(4);
        std::thread::scope(|s| {
            let guard = locks.lock_key(&3u64, LockMode::Write);
            let (tx, rx) = mpsc::channel();
            s.spawn(move || {
                let all = locks.lock_all(LockMode::Read);
                tx.send(all.stripe_indices()).unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(guard);
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), vec![0, 1, 2, 3]);
        });
    }

    #[test]
    fn lock_all_read_shared() {
        let locks = identity_locks(4);
        let a = locks.lock_all(LockMode::Read);
        let b = locks.lock_all(LockMode::Read);
        assert_eq!(a.stripe_indices(), b.stripe_indices());
        let key = locks.lock_key(&0u64, LockMode::Read);
        assert_eq!(key.index(), 0);
    }

    #[test]
    fn lock_all_write_exclusive() {
        let locks = &identity_locks(4);
        std::thread::scope(|s| {
            let guard = locks.lock_all(LockMode::Write);
            assert_eq!(guard.mode(), LockMode::Write);
            let (tx, rx) = mpsc::channel();
            let tx_all = tx.clone();
            s.spawn(move || {
                let _guard = locks.lock_all(LockMode::Read);
                tx_all.send("all").unwrap();
            });
            s.spawn(move || {
                let _guard = locks.lock_key(&2u64, LockMode::Read);
                tx.send("key").unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(guard);
            let mut received = [
                rx.recv_timeout(UNBLOCKED).unwrap(),
                rx.recv_timeout(UNBLOCKED).unwrap(),
            ];
            received.sort_unstable();
            assert_eq!(received, ["all", "key"]);
        });
    }

    #[test]
    fn lock_subset_write() {
        let locks = &identity_locks(4);
        let keys = [1u64, 5, 9, 2];
        std::thread::scope(|s| {
            let guard = locks.lock_subset_write(keys.iter());
            assert_eq!(guard.stripe_indices(), vec![1, 2]);
            assert_eq!(guard.mode(), LockMode::Write);

            // Untouched stripes stay available to per-key operations.
            let (tx, rx) = mpsc::channel();
            let tx_untouched = tx.clone();
            s.spawn(move || {
                let _guard = locks.lock_key(&3u64, LockMode::Write);
                tx_untouched.send(3u64).unwrap();
            });
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), 3);

            s.spawn(move || {
                let _guard = locks.lock_key(&6u64, LockMode::Read);
                tx.send(6u64).unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(guard);
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), 6);
        });
    }

    #[test]
    fn lock_subset_write_empty_holds_barrier() {
        let locks = &identity_locks(2);
        std::thread::scope(|s| {
            let guard = locks.lock_subset_write(std::iter::empty::<&u64>());
            assert!(guard.stripe_indices().is_empty());
            let (tx, rx) = mpsc::channel();
            s.spawn(move || {
                let _guard = locks.lock_all(LockMode::Read);
                tx.send(()).unwrap();
            });
            // Per-key locking skips the barrier.
            let key = locks.lock_key(&0u64, LockMode::Write);
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(key);
            drop(guard);
            assert!(rx.recv_timeout(UNBLOCKED).is_ok());
        });
    }

    #[test]
    fn unfair_unlock() {
        crate::config::global_config_mut().set_fair_unlock(false);
        let locks = &identity_locks(2);
        crate::config::global_config_mut().set_fair_unlock(true);
        assert!(!locks.fair);

        std::thread::scope(|s| {
            let guard = locks.lock_key(&0u64, LockMode::Write);
            let (tx, rx) = mpsc::channel();
            let tx_key = tx.clone();
            s.spawn(move || {
                let _guard = locks.lock_key(&0u64, LockMode::Read);
                tx_key.send("key").unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(guard);
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), "key");

            let all = locks.lock_all(LockMode::Write);
            s.spawn(move || {
                let _guard = locks.lock_subset_write([1u64].iter());
                tx.send("subset").unwrap();
            });
            assert!(rx.recv_timeout(BLOCKED).is_err());
            drop(all);
            assert_eq!(rx.recv_timeout(UNBLOCKED).unwrap(), "subset");
        });
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn concurrent_read_sweeps_with_writers() {
        let locks = &identity_locks(8);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let guard = locks.lock_all(LockMode::Read);
                        assert_eq!(guard.stripe_indices().len(), 8);
                    }
                });
            }
            for writer in 0..4u64 {
                s.spawn(move || {
                    for i in 0..2000u64 {
                        let _guard = locks.lock_key(&(writer + i), LockMode::Write);
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..50 {
                    let _guard = locks.lock_all(LockMode::Write);
                }
            });
        });
    }
}
