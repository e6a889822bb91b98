//! Media file inspection and the probe result cache

pub mod cache;
pub mod inspector;

pub use cache::{CacheEntry, CacheStats, ProbeCache};
pub use inspector::{parse_report, MediaProbe};
