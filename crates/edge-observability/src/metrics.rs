//! Cache-level counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters shared by the incremental cache and tag cache.
///
/// All counters are monotonic and updated with relaxed ordering; read them
/// through [`CacheMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hot_hits: AtomicU64,
    storage_hits: AtomicU64,
    misses: AtomicU64,
    read_errors: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    backfills: AtomicU64,
    backfill_failures: AtomicU64,
    tag_writes: AtomicU64,
    forced_revalidations: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    /// Reads served by the edge cache.
    pub hot_hits: u64,
    /// Reads served by the durable store.
    pub storage_hits: u64,
    /// Reads that found nothing.
    pub misses: u64,
    /// Reads that failed and were reported as misses.
    pub read_errors: u64,
    /// Successful durable writes.
    pub writes: u64,
    /// Failed durable writes.
    pub write_failures: u64,
    /// Completed edge cache backfills.
    pub backfills: u64,
    /// Failed edge cache backfills.
    pub backfill_failures: u64,
    /// Tag manifest writes.
    pub tag_writes: u64,
    /// `get_last_modified` calls that forced revalidation.
    pub forced_revalidations: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Increment `", stringify!($field), "`.")]
            pub fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )+
    };
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        record_hot_hit => hot_hits,
        record_storage_hit => storage_hits,
        record_miss => misses,
        record_read_error => read_errors,
        record_write => writes,
        record_write_failure => write_failures,
        record_backfill => backfills,
        record_backfill_failure => backfill_failures,
        record_tag_write => tag_writes,
        record_forced_revalidation => forced_revalidations,
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hot_hits: self.hot_hits.load(Ordering::Relaxed),
            storage_hits: self.storage_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            backfills: self.backfills.load(Ordering::Relaxed),
            backfill_failures: self.backfill_failures.load(Ordering::Relaxed),
            tag_writes: self.tag_writes.load(Ordering::Relaxed),
            forced_revalidations: self.forced_revalidations.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetricsSnapshot {
    /// Fraction of reads served from either tier.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hot_hits + self.storage_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = CacheMetrics::new();
        metrics.record_hot_hit();
        metrics.record_storage_hit();
        metrics.record_storage_hit();
        metrics.record_miss();
        metrics.record_backfill_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.hot_hits, 1);
        assert_eq!(snap.storage_hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.backfill_failures, 1);
        assert_eq!(snap.writes, 0);
        assert!((snap.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_ratio_empty() {
        assert_eq!(CacheMetricsSnapshot::default().hit_ratio(), 0.0);
    }
}
