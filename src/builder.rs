use std::hash::Hash;
use std::sync::Arc;

use crate::cache::{Cache, DEFAULT_CONCURRENCY_LEVEL, DEFAULT_INITIAL_CAPACITY};
use crate::error::{CacheError, Result};
use crate::listener::EvictionListener;
use crate::weigher::{Singleton, Weigher};

/// Builder for configuring a [`Cache`].
///
/// # Example
///
/// ```
/// use weighted_lru::CacheBuilder;
///
/// let cache = CacheBuilder::<String, Vec<u8>>::new()
///     .maximum_weighted_capacity(64 * 1024) // 64 KiB of values
///     .weigher(|_key: &String, value: &Vec<u8>| value.len().max(1) as u32)
///     .concurrency_level(32)
///     .build()
///     .unwrap();
/// assert!(cache.is_empty());
/// ```
pub struct CacheBuilder<K, V> {
	capacity: Option<u64>,
	initial_capacity: usize,
	concurrency_level: usize,
	weigher: Arc<dyn Weigher<K, V>>,
	listener: Option<Arc<dyn EvictionListener<K, V>>>,
}

impl<K, V> CacheBuilder<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Create a builder with default settings and no capacity.
	pub fn new() -> Self {
		Self {
			capacity: None,
			initial_capacity: DEFAULT_INITIAL_CAPACITY,
			concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
			weigher: Arc::new(Singleton),
			listener: None,
		}
	}

	/// Set the maximum weighted capacity. Required.
	///
	/// The cache may exceed it briefly between a write and the drain that
	/// follows. Values above [`MAXIMUM_CAPACITY`](crate::MAXIMUM_CAPACITY)
	/// are clamped.
	pub fn maximum_weighted_capacity(mut self, capacity: u64) -> Self {
		self.capacity = Some(capacity);
		self
	}

	/// Set how many entries the hash table is sized for up front.
	///
	/// Default: 16
	pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
		self.initial_capacity = initial_capacity;
		self
	}

	/// Set the number of hash-table shards.
	///
	/// More shards reduce contention between writers. Will be rounded up to
	/// the next power of 2; must not be 0.
	///
	/// Default: 16
	pub fn concurrency_level(mut self, concurrency_level: usize) -> Self {
		self.concurrency_level = concurrency_level;
		self
	}

	/// Set the weigher.
	///
	/// Default: [`Weighers::singleton`](crate::Weighers::singleton), which
	/// bounds the cache by entry count.
	pub fn weigher(mut self, weigher: impl Weigher<K, V> + 'static) -> Self {
		self.weigher = Arc::new(weigher);
		self
	}

	/// Set the listener called for entries evicted to stay within capacity.
	pub fn listener(mut self, listener: impl EvictionListener<K, V> + 'static) -> Self {
		self.listener = Some(Arc::new(listener));
		self
	}

	/// Build the cache with the configured settings.
	///
	/// Fails if no capacity was set or the concurrency level is 0.
	pub fn build(self) -> Result<Cache<K, V>> {
		let capacity = self.capacity.ok_or(CacheError::IllegalState("maximum weighted capacity is required"))?;
		if self.concurrency_level == 0 {
			return Err(CacheError::InvalidArgument("concurrency level must be at least 1".to_string()));
		}

		Ok(Cache::with_config(
			capacity,
			self.initial_capacity,
			self.concurrency_level,
			self.weigher,
			self.listener,
		))
	}
}

impl<K, V> Default for CacheBuilder<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MAXIMUM_CAPACITY, Weighers};

	#[test]
	fn test_builder_default() {
		let cache = CacheBuilder::<u32, u32>::default().maximum_weighted_capacity(1024).build().unwrap();
		assert!(cache.is_empty());
		assert_eq!(cache.capacity(), 1024);
	}

	#[test]
	fn test_builder_requires_capacity() {
		let err = CacheBuilder::<u32, u32>::new().build().unwrap_err();
		assert_eq!(err, CacheError::IllegalState("maximum weighted capacity is required"));
	}

	#[test]
	fn test_builder_rejects_zero_concurrency_level() {
		let result = CacheBuilder::<u32, u32>::new().maximum_weighted_capacity(10).concurrency_level(0).build();
		assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
	}

	#[test]
	fn test_builder_clamps_capacity() {
		let cache = CacheBuilder::<u32, u32>::new().maximum_weighted_capacity(u64::MAX).build().unwrap();
		assert_eq!(cache.capacity(), MAXIMUM_CAPACITY);
	}

	#[test]
	fn test_builder_with_byte_len_weigher() {
		let cache = CacheBuilder::<u32, String>::new()
			.maximum_weighted_capacity(10)
			.initial_capacity(64)
			.concurrency_level(3)
			.weigher(Weighers::byte_len())
			.build()
			.unwrap();

		cache.put(1, "hello".to_string()).unwrap();
		cache.put(2, "world".to_string()).unwrap();
		cache.run_pending_tasks();
		assert_eq!(cache.weighted_size(), 10);

		cache.put(3, "!".to_string()).unwrap();
		cache.run_pending_tasks();
		assert!(!cache.contains_key(&1));
		assert_eq!(cache.weighted_size(), 6);
	}

	#[test]
	fn test_zero_capacity_holds_nothing() {
		let cache = CacheBuilder::<u32, u32>::new().maximum_weighted_capacity(0).build().unwrap();
		cache.put(1, 1).unwrap();
		cache.run_pending_tasks();
		assert!(cache.is_empty());
	}
}
