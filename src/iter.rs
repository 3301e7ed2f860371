use std::hash::Hash;
use std::iter::FusedIterator;
use std::sync::Arc;
use std::vec;

use crate::node::Node;
use crate::table::Table;

/// Iterator over live entries, returned by [`Cache::iter`](crate::Cache::iter).
///
/// Copies one shard at a time, holding that shard's read lock only while
/// copying. Entries removed after their shard was copied may still be
/// yielded; entries added to shards not yet reached will be.
pub struct Iter<'a, K, V> {
	table: &'a Table<K, V>,
	next_shard: usize,
	current: vec::IntoIter<Arc<Node<K, V>>>,
}

impl<'a, K, V> Iter<'a, K, V>
where
	K: Hash + Eq,
{
	pub(crate) fn new(table: &'a Table<K, V>) -> Self {
		Self {
			table,
			next_shard: 0,
			current: Vec::new().into_iter(),
		}
	}
}

impl<K, V> Iterator for Iter<'_, K, V>
where
	K: Hash + Eq + Clone,
{
	type Item = (K, Arc<V>);

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			for node in self.current.by_ref() {
				let current = node.load();
				if current.is_alive() {
					return Some((node.key.clone(), Arc::clone(&current.value)));
				}
			}
			if self.next_shard >= self.table.shard_count() {
				return None;
			}
			self.current = self.table.shard_nodes(self.next_shard).into_iter();
			self.next_shard += 1;
		}
	}
}

impl<K, V> FusedIterator for Iter<'_, K, V> where K: Hash + Eq + Clone {}

/// Iterator over live keys, returned by [`Cache::keys`](crate::Cache::keys).
pub struct Keys<'a, K, V> {
	inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
	pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
		Self {
			inner,
		}
	}
}

impl<K, V> Iterator for Keys<'_, K, V>
where
	K: Hash + Eq + Clone,
{
	type Item = K;

	fn next(&mut self) -> Option<K> {
		self.inner.next().map(|(key, _)| key)
	}
}

/// Iterator over live values, returned by [`Cache::values`](crate::Cache::values).
pub struct Values<'a, K, V> {
	inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
	pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
		Self {
			inner,
		}
	}
}

impl<K, V> Iterator for Values<'_, K, V>
where
	K: Hash + Eq + Clone,
{
	type Item = Arc<V>;

	fn next(&mut self) -> Option<Arc<V>> {
		self.inner.next().map(|(_, value)| value)
	}
}
