//! Stripestore global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

/// The default number of lock stripes per available core.
const STRIPES_PER_CORE: usize = 10;

/// Global configuration options for the stripestore crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Default Concurrency Level
/// > default: [`std::thread::available_parallelism`]`() * 10`
///
/// The number of lock stripes used by a [`StripedStore`](crate::StripedStore) constructed without an explicit concurrency level.
/// A value of zero is treated as one.
///
/// ## Fair Unlock
/// > default: [`true`]
///
/// If enabled, stripe and barrier locks are released fairly, handing the lock directly to the longest waiting thread.
/// This bounds writer starvation at some cost in throughput.
/// Changes apply to stores created after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    default_concurrency_level: usize,
    fair_unlock: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            default_concurrency_level: cores * STRIPES_PER_CORE,
            fair_unlock: true,
        }
    }
}

impl Config {
    /// Get the [default concurrency level](#default-concurrency-level) configuration.
    #[must_use]
    pub fn default_concurrency_level(&self) -> usize {
        self.default_concurrency_level
    }

    /// Set the [default concurrency level](#default-concurrency-level) configuration.
    pub fn set_default_concurrency_level(&mut self, concurrency_level: usize) {
        self.default_concurrency_level = concurrency_level;
    }

    /// Get the [fair unlock](#fair-unlock) configuration.
    #[must_use]
    pub fn fair_unlock(&self) -> bool {
        self.fair_unlock
    }

    /// Set the [fair unlock](#fair-unlock) configuration.
    pub fn set_fair_unlock(&mut self, fair_unlock: bool) {
        self.fair_unlock = fair_unlock;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global stripestore configuration.
///
/// Do not hold the returned guard while constructing a store, that would deadlock if another thread holds [`global_config_mut`].
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global stripestore configuration.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}
