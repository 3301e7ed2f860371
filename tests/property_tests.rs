use std::collections::VecDeque;

use proptest::prelude::*;
use weighted_lru::{Cache, CacheBuilder};

#[derive(Debug, Clone)]
enum Op {
	Put(u8, u32),
	Get(u8),
	Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
	prop_oneof![
		3 => (0u8..16, 1u32..6).prop_map(|(key, weight)| Op::Put(key, weight)),
		2 => (0u8..16).prop_map(Op::Get),
		1 => (0u8..16).prop_map(Op::Remove),
	]
}

/// Values double as their own weight.
fn weighted_cache(capacity: u64) -> Cache<u8, u32> {
	CacheBuilder::new().maximum_weighted_capacity(capacity).weigher(|_: &u8, value: &u32| *value).build().unwrap()
}

/// Sequential LRU, least recently used first.
#[derive(Default)]
struct Model {
	entries: VecDeque<(u8, u32)>,
	capacity: u64,
}

impl Model {
	fn position(&self, key: u8) -> Option<usize> {
		self.entries.iter().position(|(k, _)| *k == key)
	}

	fn weighted_size(&self) -> u64 {
		self.entries.iter().map(|(_, weight)| u64::from(*weight)).sum()
	}

	fn put(&mut self, key: u8, weight: u32) {
		if let Some(index) = self.position(key) {
			self.entries.remove(index);
		}
		self.entries.push_back((key, weight));
		while self.weighted_size() > self.capacity {
			self.entries.pop_front();
		}
	}

	fn get(&mut self, key: u8) -> Option<u32> {
		let index = self.position(key)?;
		let entry = self.entries.remove(index)?;
		self.entries.push_back(entry);
		Some(entry.1)
	}

	fn remove(&mut self, key: u8) -> Option<u32> {
		let index = self.position(key)?;
		self.entries.remove(index).map(|(_, weight)| weight)
	}

	fn keys(&self) -> Vec<u8> {
		self.entries.iter().map(|(key, _)| *key).collect()
	}
}

proptest! {
	#[test]
	fn test_agrees_with_sequential_lru(capacity in 5u64..30, ops in prop::collection::vec(op(), 1..200)) {
		let cache = weighted_cache(capacity);
		let mut model = Model { capacity, ..Model::default() };

		for op in ops {
			match op {
				Op::Put(key, weight) => {
					cache.put(key, weight).unwrap();
					model.put(key, weight);
				}
				Op::Get(key) => {
					prop_assert_eq!(cache.get(&key).as_deref().copied(), model.get(key));
				}
				Op::Remove(key) => {
					prop_assert_eq!(cache.remove(&key).as_deref().copied(), model.remove(key));
				}
			}
		}

		cache.run_pending_tasks();
		prop_assert_eq!(cache.ascending_key_set().into_iter().collect::<Vec<_>>(), model.keys());
		prop_assert_eq!(cache.weighted_size(), model.weighted_size());
		prop_assert_eq!(cache.len(), model.entries.len());
	}

	#[test]
	fn test_capacity_holds_after_drain(
		capacity in 1u64..50,
		puts in prop::collection::vec((0u8..64, 1u32..20), 1..100)
	) {
		let cache = weighted_cache(capacity);

		for (key, weight) in puts {
			cache.put(key, weight).unwrap();
			cache.run_pending_tasks();
			prop_assert!(cache.weighted_size() <= capacity);
		}
	}

	#[test]
	fn test_at_most_one_entry_per_key(keys in prop::collection::vec(0u8..10, 1..100)) {
		let cache = Cache::new(1024);

		for (i, key) in keys.iter().enumerate() {
			cache.put(*key, i).unwrap();
		}

		let mut distinct = keys.clone();
		distinct.sort_unstable();
		distinct.dedup();
		prop_assert_eq!(cache.len(), distinct.len());
		prop_assert_eq!(cache.iter().count(), distinct.len());

		cache.run_pending_tasks();
		prop_assert_eq!(cache.weighted_size(), distinct.len() as u64);
	}

	#[test]
	fn test_clear_empties_cache(puts in prop::collection::vec((0u8..64, 1u32..20), 1..50)) {
		let cache = weighted_cache(1024);

		for (key, weight) in puts {
			cache.put(key, weight).unwrap();
		}

		cache.clear();

		prop_assert_eq!(cache.len(), 0);
		prop_assert_eq!(cache.weighted_size(), 0);
		prop_assert!(cache.is_empty());
	}

	#[test]
	fn test_not_contains_after_remove(keys in prop::collection::vec(0u8..50, 5..20)) {
		let cache = Cache::new(1024);

		for key in &keys {
			cache.put(*key, ()).unwrap();
		}

		for key in &keys {
			cache.remove(key);
			prop_assert!(!cache.contains_key(key));
		}
	}
}

#[test]
fn test_no_panics_on_empty_operations() {
	let cache: Cache<u8, u32> = Cache::new(1024);

	assert!(cache.get(&1).is_none());
	assert!(cache.remove(&1).is_none());
	assert!(!cache.contains_key(&1));
	assert_eq!(cache.len(), 0);
	assert_eq!(cache.weighted_size(), 0);
	assert!(cache.ascending_map().is_empty());

	cache.clear();
	cache.run_pending_tasks();
}

#[test]
fn test_duplicate_insertions() {
	let cache = weighted_cache(10240);

	for i in 1..100 {
		cache.put(1, i).unwrap();
	}

	assert_eq!(cache.len(), 1);
	cache.run_pending_tasks();
	assert_eq!(cache.weighted_size(), 99);
}
