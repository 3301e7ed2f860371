//! Operations that hold the eviction lock for their whole duration.
//!
//! None of these are O(1). They force a full drain so that the eviction deque
//! reflects every operation that completed before the call, then work on the
//! deque directly.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::debug;

use super::{Cache, MAXIMUM_CAPACITY};
use crate::deque::DequeIter;
use crate::node::Node;

impl<K, V> Cache<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Apply every buffered task and evict down to capacity.
	///
	/// Waits for the eviction lock. Mostly useful in tests and before reading
	/// [`weighted_size`](Self::weighted_size) when an exact value matters.
	pub fn run_pending_tasks(&self) {
		{
			let mut state = self.eviction.lock();
			self.drain_locked(&mut state, true);
		}
		self.notify_listener();
	}

	/// Change the maximum weighted capacity, evicting immediately if the cache
	/// is now over it.
	///
	/// Capacities above [`MAXIMUM_CAPACITY`] are clamped. Blocks until the
	/// evictions are done.
	pub fn set_capacity(&self, capacity: u64) {
		let capacity = capacity.min(MAXIMUM_CAPACITY);
		{
			let mut state = self.eviction.lock();
			self.capacity.store(capacity, Ordering::Relaxed);
			self.drain_locked(&mut state, true);
			debug!(capacity, weighted_size = self.weighted_size(), "set capacity");
		}
		self.notify_listener();
	}

	/// Remove every entry.
	///
	/// Pending writes are applied first and pending reads are dropped. Entries
	/// added concurrently with the call may survive it. Cleared entries are not
	/// passed to the eviction listener.
	pub fn clear(&self) {
		let mut state = self.eviction.lock();
		self.apply_pending_writes(&mut state);
		let mut cleared = 0usize;
		while let Some(node) = state.deque.pop_front() {
			if self.table.remove_node(&node) {
				cleared += 1;
			}
			self.make_dead(&node);
		}
		debug!(cleared, "cleared cache");
	}

	/// Keys from least to most likely to be retained.
	///
	/// Holds the eviction lock while copying, so this is linear in the number
	/// of entries. The returned keys are a copy and never change.
	pub fn ascending_key_set(&self) -> Vec<K> {
		self.ascending_key_set_with_limit(usize::MAX)
	}

	/// At most `limit` keys, starting with the least likely to be retained.
	pub fn ascending_key_set_with_limit(&self, limit: usize) -> Vec<K> {
		self.ordered_snapshot(true, limit, |node| node.key.clone())
	}

	/// Keys from most to least likely to be retained.
	///
	/// Linear in the number of entries; see [`ascending_key_set`](Self::ascending_key_set).
	pub fn descending_key_set(&self) -> Vec<K> {
		self.descending_key_set_with_limit(usize::MAX)
	}

	/// At most `limit` keys, starting with the hottest.
	pub fn descending_key_set_with_limit(&self, limit: usize) -> Vec<K> {
		self.ordered_snapshot(false, limit, |node| node.key.clone())
	}

	/// Entries from least to most likely to be retained.
	///
	/// Linear in the number of entries; the entries are a point-in-time copy.
	pub fn ascending_map(&self) -> Vec<(K, Arc<V>)> {
		self.ascending_map_with_limit(usize::MAX)
	}

	/// At most `limit` entries, starting with the least likely to be retained.
	pub fn ascending_map_with_limit(&self, limit: usize) -> Vec<(K, Arc<V>)> {
		self.ordered_snapshot(true, limit, |node| (node.key.clone(), node.value()))
	}

	/// Entries from most to least likely to be retained.
	///
	/// Linear in the number of entries; the entries are a point-in-time copy.
	pub fn descending_map(&self) -> Vec<(K, Arc<V>)> {
		self.descending_map_with_limit(usize::MAX)
	}

	/// At most `limit` entries, starting with the hottest.
	pub fn descending_map_with_limit(&self, limit: usize) -> Vec<(K, Arc<V>)> {
		self.ordered_snapshot(false, limit, |node| (node.key.clone(), node.value()))
	}

	fn ordered_snapshot<T>(&self, ascending: bool, limit: usize, entry: impl Fn(&Node<K, V>) -> T) -> Vec<T> {
		let snapshot = {
			let mut state = self.eviction.lock();
			self.drain_locked(&mut state, true);
			let nodes: DequeIter<'_, K, V> = if ascending {
				state.deque.iter()
			} else {
				state.deque.iter_rev()
			};
			nodes.filter(|node| node.is_alive()).take(limit).map(entry).collect()
		};
		self.notify_listener();
		snapshot
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn filled(capacity: u64, count: u32) -> Cache<u32, u32> {
		let cache = Cache::new(capacity);
		for i in 0..count {
			cache.put(i, i * 10).unwrap();
		}
		cache
	}

	#[test]
	fn test_ascending_and_descending_key_sets() {
		let cache = filled(10, 4);
		cache.get(&0);

		assert_eq!(cache.ascending_key_set(), vec![1, 2, 3, 0]);
		assert_eq!(cache.descending_key_set(), vec![0, 3, 2, 1]);
	}

	#[test]
	fn test_limits() {
		let cache = filled(10, 5);

		assert_eq!(cache.ascending_key_set_with_limit(2).len(), 2);
		assert!(cache.descending_key_set_with_limit(0).is_empty());
		assert_eq!(cache.descending_key_set_with_limit(100).len(), 5);

		let hottest = cache.descending_map_with_limit(1);
		assert_eq!(hottest.iter().map(|(key, value)| (*key, **value)).collect::<Vec<_>>(), vec![(4, 40)]);
		let coldest = cache.ascending_map_with_limit(1);
		assert_eq!(coldest.first().map(|(key, value)| (*key, **value)), Some((0, 0)));
	}

	#[test]
	fn test_maps_hold_values() {
		let cache = filled(10, 3);
		let map = cache.ascending_map();
		let entries: Vec<_> = map.iter().map(|(key, value)| (*key, **value)).collect();
		assert_eq!(entries, vec![(0, 0), (1, 10), (2, 20)]);
		assert_eq!(cache.descending_map().len(), 3);
	}

	#[test]
	fn test_set_capacity_evicts_coldest() {
		let cache = filled(10, 6);
		cache.set_capacity(3);

		assert_eq!(cache.capacity(), 3);
		assert_eq!(cache.weighted_size(), 3);
		assert_eq!(cache.ascending_key_set(), vec![3, 4, 5]);

		cache.set_capacity(u64::MAX);
		assert_eq!(cache.capacity(), MAXIMUM_CAPACITY);
	}

	#[test]
	fn test_clear_removes_everything() {
		let cache = filled(10, 5);
		cache.clear();

		assert!(cache.is_empty());
		assert_eq!(cache.weighted_size(), 0);
		assert!(cache.ascending_key_set().is_empty());

		cache.put(1, 1).unwrap();
		assert_eq!(cache.get_quietly(&1).as_deref(), Some(&1));
	}

	#[test]
	fn test_clear_applies_buffered_removal() {
		let cache = filled(10, 3);
		cache.remove(&1);
		cache.clear();

		assert!(cache.is_empty());
		assert_eq!(cache.weighted_size(), 0);
		assert_eq!(cache.metrics().evictions, 0);
	}
}
