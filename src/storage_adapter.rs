//! Storage adapters.
//!
//! Storage adapters can be layered on stores, including a [`StripedStore`](crate::StripedStore).

pub mod performance_metrics;
pub mod unchecked;
pub mod usage_log;
