use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::node::Node;

/// Thread-safe key to node map; the source of truth for containment.
///
/// Keys are spread over `RwLock`-protected shards by hash so that readers never
/// contend with each other and writers only contend within a shard.
pub(crate) struct Table<K, V> {
	shards: Box<[RwLock<HashMap<K, Arc<Node<K, V>>>>]>,
	/// Selects the shard; independent of the per-shard hasher
	hasher: ahash::RandomState,
	shard_mask: usize,
}

impl<K, V> Table<K, V>
where
	K: Hash + Eq + Clone,
{
	/// Create a table with `shard_count` shards (rounded up to a power of two)
	/// and room for `initial_capacity` entries overall.
	pub(crate) fn new(shard_count: usize, initial_capacity: usize) -> Self {
		let shard_count = shard_count.max(1).next_power_of_two();
		let per_shard = initial_capacity.div_ceil(shard_count);

		let shards = (0..shard_count).map(|_| RwLock::new(HashMap::with_capacity(per_shard))).collect();

		Self {
			shards,
			hasher: ahash::RandomState::new(),
			shard_mask: shard_count - 1,
		}
	}

	pub(crate) fn shard_count(&self) -> usize {
		self.shards.len()
	}

	fn shard<Q>(&self, key: &Q) -> &RwLock<HashMap<K, Arc<Node<K, V>>>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let index = (self.hasher.hash_one(key) as usize) & self.shard_mask;
		&self.shards[index]
	}

	pub(crate) fn get<Q>(&self, key: &Q) -> Option<Arc<Node<K, V>>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.shard(key).read().get(key).cloned()
	}

	pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.shard(key).read().contains_key(key)
	}

	/// Insert `node` unless the key is already mapped.
	///
	/// Returns the node already present, if any.
	pub(crate) fn put_if_absent(&self, node: &Arc<Node<K, V>>) -> Option<Arc<Node<K, V>>> {
		let mut shard = self.shard(&node.key).write();
		match shard.entry(node.key.clone()) {
			Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
			Entry::Vacant(entry) => {
				entry.insert(Arc::clone(node));
				None
			}
		}
	}

	pub(crate) fn remove<Q>(&self, key: &Q) -> Option<Arc<Node<K, V>>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.shard(key).write().remove(key)
	}

	/// Remove the mapping for `node.key` only if it still points at `node`.
	pub(crate) fn remove_node(&self, node: &Arc<Node<K, V>>) -> bool {
		let mut shard = self.shard(&node.key).write();
		match shard.get(&node.key) {
			Some(current) if Arc::ptr_eq(current, node) => {
				shard.remove(&node.key);
				true
			}
			_ => false,
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.shards.iter().map(|shard| shard.read().len()).sum()
	}

	/// Copy out the nodes of one shard.
	pub(crate) fn shard_nodes(&self, index: usize) -> Vec<Arc<Node<K, V>>> {
		self.shards[index].read().values().cloned().collect()
	}
}
