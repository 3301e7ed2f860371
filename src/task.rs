use std::sync::Arc;

use crate::node::Node;

/// A pending change to the eviction policy, recorded by the calling thread and
/// applied later by whichever thread drains the buffers.
pub(crate) struct Task<K, V> {
	/// Assigned from a shared counter; only weakly ordered across threads.
	pub(crate) order: u64,
	pub(crate) kind: TaskKind<K, V>,
}

pub(crate) enum TaskKind<K, V> {
	/// The entry was accessed.
	Read(Arc<Node<K, V>>),
	/// The entry was inserted with the given weight.
	Add {
		node: Arc<Node<K, V>>,
		weight: i64,
	},
	/// The entry's value was replaced, changing its weight by `delta`.
	Update {
		node: Arc<Node<K, V>>,
		delta: i64,
	},
	/// The entry was removed from the table.
	Remove(Arc<Node<K, V>>),
}

impl<K, V> Task<K, V> {
	pub(crate) fn new(order: u64, kind: TaskKind<K, V>) -> Self {
		Self {
			order,
			kind,
		}
	}

	/// Writes change the weighted size and must never be dropped.
	pub(crate) fn is_write(&self) -> bool {
		!matches!(self.kind, TaskKind::Read(_))
	}
}
