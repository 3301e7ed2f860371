//! Cache performance metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache counters.
///
/// Counters are updated with relaxed atomics, so a snapshot taken while other
/// threads are busy may be slightly inconsistent across fields.
///
/// # Example
///
/// ```
/// use weighted_lru::Cache;
///
/// let cache: Cache<u64, String> = Cache::new(1024);
/// // ... perform cache operations ...
///
/// let metrics = cache.metrics();
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// println!("Utilization: {:.2}%", metrics.utilization() * 100.0);
/// println!("Evictions: {}", metrics.evictions);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
	/// Lookups through `get` that found a live entry.
	pub hits: u64,
	/// Lookups through `get` that found nothing.
	pub misses: u64,
	/// Entries added for a previously absent key.
	pub inserts: u64,
	/// Values replaced on an existing entry.
	pub updates: u64,
	/// Entries removed explicitly.
	pub removals: u64,
	/// Entries evicted to stay within capacity.
	pub evictions: u64,
	/// Drains that applied buffered tasks.
	pub drains: u64,
	/// Weighted size at the time of the snapshot.
	pub weighted_size: u64,
	/// Maximum weighted capacity.
	pub capacity: u64,
	/// Number of entries in the hash table.
	pub entry_count: usize,
}

impl CacheMetrics {
	/// Hit rate between 0.0 and 1.0, or 0.0 without any lookups.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Fraction of the capacity in use.
	pub fn utilization(&self) -> f64 {
		if self.capacity == 0 {
			0.0
		} else {
			self.weighted_size as f64 / self.capacity as f64
		}
	}

	/// Total number of lookups (hits + misses).
	pub fn total_accesses(&self) -> u64 {
		self.hits + self.misses
	}

	/// Total number of write operations (inserts + updates).
	pub fn total_writes(&self) -> u64 {
		self.inserts + self.updates
	}
}

/// Live counters behind [`CacheMetrics`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
	pub(crate) hits: AtomicU64,
	pub(crate) misses: AtomicU64,
	pub(crate) inserts: AtomicU64,
	pub(crate) updates: AtomicU64,
	pub(crate) removals: AtomicU64,
	pub(crate) evictions: AtomicU64,
	pub(crate) drains: AtomicU64,
}

impl Counters {
	#[inline]
	pub(crate) fn record(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self, weighted_size: u64, capacity: u64, entry_count: usize) -> CacheMetrics {
		CacheMetrics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			inserts: self.inserts.load(Ordering::Relaxed),
			updates: self.updates.load(Ordering::Relaxed),
			removals: self.removals.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			drains: self.drains.load(Ordering::Relaxed),
			weighted_size,
			capacity,
			entry_count,
		}
	}
}
