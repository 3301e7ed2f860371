use std::cell::UnsafeCell;
use std::ptr::NonNull;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::weighted::{State, WeightedValue};

/// Intrusive links into the eviction deque.
///
/// Only read or written by the deque, which is only reachable while the
/// eviction lock is held.
pub(crate) struct Links<K, V> {
	pub(crate) prev: Option<NonNull<Node<K, V>>>,
	pub(crate) next: Option<NonNull<Node<K, V>>>,
}

/// An entry shared by the hash table and the eviction deque.
///
/// The table holds one strong reference per key, the deque holds another while
/// the node is linked. The node is freed once both have let go of it.
pub(crate) struct Node<K, V> {
	pub(crate) key: K,
	state: ArcSwap<WeightedValue<V>>,
	links: UnsafeCell<Links<K, V>>,
}

// SAFETY: `state` is an atomic reference. `links` is only dereferenced by the
// `EvictionDeque`, which lives behind the eviction mutex, so no two threads
// ever touch the links concurrently.
unsafe impl<K: Send + Sync, V: Send + Sync> Send for Node<K, V> {}
unsafe impl<K: Send + Sync, V: Send + Sync> Sync for Node<K, V> {}

impl<K, V> Node<K, V> {
	pub(crate) fn new(key: K, value: WeightedValue<V>) -> Self {
		Self {
			key,
			state: ArcSwap::from_pointee(value),
			links: UnsafeCell::new(Links {
				prev: None,
				next: None,
			}),
		}
	}

	/// Current weighted value.
	#[inline]
	pub(crate) fn load(&self) -> Arc<WeightedValue<V>> {
		self.state.load_full()
	}

	/// Current value, whatever the lifecycle state.
	pub(crate) fn value(&self) -> Arc<V> {
		Arc::clone(&self.state.load().value)
	}

	#[inline]
	pub(crate) fn is_alive(&self) -> bool {
		self.state.load().is_alive()
	}

	/// Swap in `new` if the node still holds exactly `current`.
	pub(crate) fn compare_and_set(
		&self,
		current: &Arc<WeightedValue<V>>,
		new: WeightedValue<V>,
	) -> bool {
		let previous = self.state.compare_and_swap(current, Arc::new(new));
		Arc::ptr_eq(&previous, current)
	}

	/// Retire the node if it still holds `expect` and `expect` is alive.
	///
	/// Fails without retrying if the value changed underneath.
	pub(crate) fn try_to_retire(&self, expect: &Arc<WeightedValue<V>>) -> bool {
		expect.is_alive() && self.compare_and_set(expect, expect.retired())
	}

	/// Retire the node, retrying until it is retired or found no longer alive.
	pub(crate) fn make_retired(&self) {
		loop {
			let current = self.load();
			if !current.is_alive() {
				return;
			}
			if self.compare_and_set(&current, current.retired()) {
				return;
			}
		}
	}

	/// Kill the node.
	///
	/// Returns the weight that was still charged against the cache, or `None`
	/// if the node was already dead.
	pub(crate) fn make_dead(&self) -> Option<i64> {
		loop {
			let current = self.load();
			if current.state() == State::Dead {
				return None;
			}
			if self.compare_and_set(&current, current.dead()) {
				return Some(current.charged());
			}
		}
	}

	/// Raw access to the deque links.
	///
	/// # Safety
	///
	/// The caller must hold the eviction lock and must not create overlapping
	/// mutable references to the same node's links.
	#[allow(clippy::mut_from_ref)]
	pub(crate) unsafe fn links(&self) -> &mut Links<K, V> {
		// SAFETY: upheld by the caller.
		unsafe { &mut *self.links.get() }
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;

	fn node(weight: i64) -> Node<&'static str, u32> {
		Node::new("k", WeightedValue::new(Arc::new(7), weight))
	}

	#[test]
	fn test_try_to_retire_requires_current_value() {
		let node = node(2);
		let stale = node.load();

		assert!(node.compare_and_set(&stale, WeightedValue::new(Arc::new(8), 2)));
		assert!(!node.try_to_retire(&stale));
		assert!(node.is_alive());

		let current = node.load();
		assert!(node.try_to_retire(&current));
		assert_eq!(node.load().state(), State::Retired);
		assert_eq!(*node.value(), 8);
	}

	#[test]
	fn test_make_retired_is_idempotent() {
		let node = node(3);
		node.make_retired();
		node.make_retired();
		assert_eq!(node.load().weight, -3);
	}

	#[test]
	fn test_make_dead_reports_charged_weight_once() {
		let node = node(4);
		node.make_retired();
		assert_eq!(node.make_dead(), Some(4));
		assert_eq!(node.make_dead(), None);
		assert_eq!(node.load().state(), State::Dead);

		// Retiring a dead node is a no-op.
		node.make_retired();
		assert_eq!(node.load().state(), State::Dead);
	}

	#[test]
	fn test_concurrent_make_dead_single_winner() {
		let node = Arc::new(Node::new(1u64, WeightedValue::new(Arc::new(1u64), 6)));

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let node = Arc::clone(&node);
				thread::spawn(move || node.make_dead())
			})
			.collect();

		let charged: Vec<_> = handles
			.into_iter()
			.filter_map(|handle| handle.join().expect("thread should not panic"))
			.collect();

		assert_eq!(charged, vec![6]);
	}
}
