use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BUFFER_THRESHOLD, Buffers};
use crate::error::Result;
use crate::iter::{Iter, Keys, Values};
use crate::listener::EvictionListener;
use crate::metrics::{CacheMetrics, Counters};
use crate::node::Node;
use crate::table::Table;
use crate::task::TaskKind;
use crate::weigher::{BoundedWeigher, Singleton, Weigher};
use crate::weighted::WeightedValue;

mod drain;
mod snapshot;

use drain::{DrainStatus, EvictionState};

/// Largest weighted capacity a cache accepts; larger requests are clamped.
pub const MAXIMUM_CAPACITY: u64 = i64::MAX as u64 - u32::MAX as u64;

/// Default number of hash-table shards.
pub(crate) const DEFAULT_CONCURRENCY_LEVEL: usize = 16;

/// Default number of entries the table is sized for up front.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Thread-safe, weight-bounded map with least-recently-used eviction.
///
/// Can be shared across threads via `Arc<Cache<K, V>>`.
///
/// # Amortized LRU bookkeeping
///
/// Reads and writes go straight to a sharded hash table. The recency order
/// lives in a separate doubly-linked list that only one thread at a time may
/// touch. Instead of locking that list on every call, each operation records a
/// small task (read, add, update or remove) in one of several lock-free
/// buffers, picked by calling thread. The buffers are drained in batches by
/// whichever caller wins a `try_lock` on the eviction state; every other caller
/// returns immediately. Eviction happens at the end of a drain, and eviction
/// listeners run after the lock is released.
///
/// As a consequence the weighted size may briefly exceed the capacity between
/// a write and the next drain, and the recency order is only approximately the
/// real access order under concurrent load.
///
/// Lookups never wait on that list, but they are not lock-free: each one takes
/// a read lock on the hash-table shard that owns the key. Readers of a shard
/// share that lock and only wait for a writer inserting into or removing from
/// the same shard.
///
/// # Example
///
/// ```
/// use weighted_lru::Cache;
///
/// let cache = Cache::new(2);
/// cache.put("a", 1).unwrap();
/// cache.put("b", 2).unwrap();
/// cache.put("c", 3).unwrap();
///
/// assert!(cache.get("a").is_none());
/// assert_eq!(cache.get("c").as_deref(), Some(&3));
/// ```
pub struct Cache<K, V> {
	/// Key to node mapping, the source of truth for containment
	table: Table<K, V>,
	/// Pending policy tasks, striped by thread
	buffers: Buffers<K, V>,
	/// Eviction deque and drain bookkeeping
	eviction: Mutex<EvictionState<K, V>>,
	/// `DrainStatus` discriminant
	drain_status: AtomicU8,
	/// Source of task order numbers
	next_order: AtomicU64,
	/// Sum of the weights of all applied entries; only mutated by the drain
	weighted_size: AtomicI64,
	/// Maximum weighted size
	capacity: AtomicU64,
	weigher: BoundedWeigher<K, V>,
	listener: Option<Arc<dyn EvictionListener<K, V>>>,
	/// Evictions waiting for the listener
	pending_notifications: SegQueue<(K, Arc<V>)>,
	counters: Counters,
}

impl<K, V> Cache<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Create a cache holding at most `capacity` entries.
	///
	/// Every entry weighs 1 and no eviction listener is installed. Use
	/// [`CacheBuilder`](crate::CacheBuilder) for anything else.
	pub fn new(capacity: u64) -> Self {
		Self::with_config(
			capacity,
			DEFAULT_INITIAL_CAPACITY,
			DEFAULT_CONCURRENCY_LEVEL,
			Arc::new(Singleton),
			None,
		)
	}

	/// Create with a validated configuration. Used by `CacheBuilder`.
	pub(crate) fn with_config(
		capacity: u64,
		initial_capacity: usize,
		concurrency_level: usize,
		weigher: Arc<dyn Weigher<K, V>>,
		listener: Option<Arc<dyn EvictionListener<K, V>>>,
	) -> Self {
		let capacity = capacity.min(MAXIMUM_CAPACITY);
		let parallelism = std::thread::available_parallelism().map_or(1, |n| n.get());
		let buffers = Buffers::new(parallelism);
		let window = (1 + buffers.count()) * BUFFER_THRESHOLD;
		let table = Table::new(concurrency_level, initial_capacity);

		debug!(
			capacity,
			shards = table.shard_count(),
			buffers = buffers.count(),
			listener = listener.is_some(),
			"created cache"
		);

		Self {
			table,
			buffers,
			eviction: Mutex::new(EvictionState::new(window)),
			drain_status: AtomicU8::new(DrainStatus::Idle as u8),
			next_order: AtomicU64::new(0),
			weighted_size: AtomicI64::new(0),
			capacity: AtomicU64::new(capacity),
			weigher: BoundedWeigher::new(weigher),
			listener,
			pending_notifications: SegQueue::new(),
			counters: Counters::default(),
		}
	}

	/// Look up a value and record the access for the eviction policy.
	///
	/// Never waits on the eviction machinery: the recency update is buffered
	/// and applied by a later drain.
	pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let Some(node) = self.table.get(key) else {
			Counters::record(&self.counters.misses);
			return None;
		};
		let current = node.load();
		if !current.is_alive() {
			Counters::record(&self.counters.misses);
			return None;
		}
		Counters::record(&self.counters.hits);
		let value = Arc::clone(&current.value);
		self.after_completion(TaskKind::Read(node));
		Some(value)
	}

	/// Look up a value without touching the eviction order or the metrics.
	pub fn get_quietly<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let current = self.table.get(key)?.load();
		current.is_alive().then(|| Arc::clone(&current.value))
	}

	/// Like [`get`](Self::get), cloning the value out of its `Arc`.
	pub fn get_clone<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
		V: Clone,
	{
		self.get(key).map(|value| (*value).clone())
	}

	/// Insert or replace the value for `key`.
	///
	/// Returns the previous value, if any. Fails only if the weigher assigns
	/// the entry a weight of 0.
	pub fn put(&self, key: K, value: V) -> Result<Option<Arc<V>>> {
		self.put_internal(key, value, false)
	}

	/// Insert the value only if `key` is absent.
	///
	/// Returns the current value if the key was already present, in which case
	/// the access counts as a read.
	pub fn put_if_absent(&self, key: K, value: V) -> Result<Option<Arc<V>>> {
		self.put_internal(key, value, true)
	}

	/// `put` every pair, stopping at the first failure.
	pub fn put_all<I>(&self, entries: I) -> Result<()>
	where
		I: IntoIterator<Item = (K, V)>,
	{
		for (key, value) in entries {
			self.put(key, value)?;
		}
		Ok(())
	}

	fn put_internal(&self, key: K, value: V, only_if_absent: bool) -> Result<Option<Arc<V>>> {
		let weight = self.weigher.weigh(&key, &value)?;
		let value = Arc::new(value);
		let node = Arc::new(Node::new(key, WeightedValue::new(Arc::clone(&value), weight)));

		loop {
			let Some(prior) = self.table.put_if_absent(&node) else {
				Counters::record(&self.counters.inserts);
				self.after_completion(TaskKind::Add {
					node,
					weight,
				});
				return Ok(None);
			};

			if only_if_absent {
				let current = prior.load();
				if current.is_alive() {
					let existing = Arc::clone(&current.value);
					self.after_completion(TaskKind::Read(prior));
					return Ok(Some(existing));
				}
			} else if let Some(old) = self.replace_value(prior, &value, weight, |_| true) {
				return Ok(Some(old));
			}

			// The mapped node is being removed; retry once it has left the table.
			std::hint::spin_loop();
		}
	}

	/// Replace the value for `key` only if it is present.
	///
	/// Returns the previous value, or `None` if the key was absent.
	/// The weigher sees the stored key, so an absent key is never weighed.
	pub fn replace<Q>(&self, key: &Q, value: V) -> Result<Option<Arc<V>>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let Some(node) = self.table.get(key) else {
			return Ok(None);
		};
		let weight = self.weigher.weigh(&node.key, &value)?;
		Ok(self.replace_value(node, &Arc::new(value), weight, |_| true))
	}

	/// Replace the value for `key` only if it currently matches `old`.
	pub fn replace_if<Q>(&self, key: &Q, old: &V, value: V) -> Result<bool>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
		V: PartialEq,
	{
		let Some(node) = self.table.get(key) else {
			return Ok(false);
		};
		let weight = self.weigher.weigh(&node.key, &value)?;
		let replaced = self.replace_value(node, &Arc::new(value), weight, |current| current.contains(old));
		Ok(replaced.is_some())
	}

	/// Swap `value` into a live node accepted by `accept`, retrying on contention.
	fn replace_value(
		&self,
		node: Arc<Node<K, V>>,
		value: &Arc<V>,
		weight: i64,
		accept: impl Fn(&WeightedValue<V>) -> bool,
	) -> Option<Arc<V>> {
		loop {
			let current = node.load();
			if !current.is_alive() || !accept(&*current) {
				return None;
			}
			if node.compare_and_set(&current, WeightedValue::new(Arc::clone(value), weight)) {
				Counters::record(&self.counters.updates);
				let delta = weight - current.weight;
				let task = if delta == 0 {
					TaskKind::Read(node)
				} else {
					TaskKind::Update {
						node,
						delta,
					}
				};
				self.after_completion(task);
				return Some(Arc::clone(&current.value));
			}
		}
	}

	/// Remove `key`, returning its value if it was present.
	pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let node = self.table.remove(key)?;
		node.make_retired();
		Counters::record(&self.counters.removals);
		let value = node.value();
		self.after_completion(TaskKind::Remove(node));
		Some(value)
	}

	/// Remove `key` only if its current value matches `value`.
	pub fn remove_if<Q>(&self, key: &Q, value: &V) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
		V: PartialEq,
	{
		let Some(node) = self.table.get(key) else {
			return false;
		};
		let mut current = node.load();
		loop {
			if !current.contains(value) {
				return false;
			}
			if node.try_to_retire(&current) {
				return self.unmap_retired(node);
			}
			current = node.load();
			if !current.is_alive() {
				return false;
			}
			// An update raced in, possibly with an equal value; compare again.
		}
	}

	/// Remove every live entry for which `keep` returns false.
	///
	/// Each removal is conditional on the entry still holding the value `keep`
	/// was shown, so concurrent replacements survive.
	pub fn retain<F>(&self, mut keep: F)
	where
		F: FnMut(&K, &V) -> bool,
	{
		for shard in 0..self.table.shard_count() {
			for node in self.table.shard_nodes(shard) {
				let current = node.load();
				if current.is_alive() && !keep(&node.key, &*current.value) && node.try_to_retire(&current) {
					self.unmap_retired(node);
				}
			}
		}
	}

	/// Finish removing a node this thread has just retired.
	fn unmap_retired(&self, node: Arc<Node<K, V>>) -> bool {
		if !self.table.remove_node(&node) {
			return false;
		}
		Counters::record(&self.counters.removals);
		self.after_completion(TaskKind::Remove(node));
		true
	}

	/// Whether the table maps `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.table.contains_key(key)
	}

	/// Whether any live entry holds `value`. Linear in the number of entries.
	pub fn contains_value(&self, value: &V) -> bool
	where
		V: PartialEq,
	{
		self.values().any(|candidate| *candidate == *value)
	}

	/// Number of entries in the table.
	pub fn len(&self) -> usize {
		self.table.len()
	}

	/// Check if cache is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Sum of the weights of all entries, as last reconciled by a drain.
	pub fn weighted_size(&self) -> u64 {
		self.weighted_size.load(Ordering::Relaxed).max(0) as u64
	}

	/// Maximum weighted size the cache is kept under.
	pub fn capacity(&self) -> u64 {
		self.capacity.load(Ordering::Relaxed)
	}

	/// Weakly consistent iterator over live `(key, value)` pairs.
	///
	/// Reflects changes made to shards it has not reached yet and never
	/// returns an entry twice.
	pub fn iter(&self) -> Iter<'_, K, V> {
		Iter::new(&self.table)
	}

	/// Weakly consistent iterator over live keys.
	pub fn keys(&self) -> Keys<'_, K, V> {
		Keys::new(self.iter())
	}

	/// Weakly consistent iterator over live values.
	pub fn values(&self) -> Values<'_, K, V> {
		Values::new(self.iter())
	}

	/// Get performance metrics snapshot.
	pub fn metrics(&self) -> CacheMetrics {
		self.counters.snapshot(self.weighted_size(), self.capacity(), self.len())
	}
}

impl<K, V> fmt::Debug for Cache<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cache")
			.field("len", &self.len())
			.field("weighted_size", &self.weighted_size())
			.field("capacity", &self.capacity())
			.finish_non_exhaustive()
	}
}
