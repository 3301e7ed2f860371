use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::node::Node;

/// Intrusive doubly-linked list ordering nodes from least to most recently used.
///
/// Not thread-safe on its own: the cache keeps it inside the eviction mutex and
/// every method requires `&mut self` or `&self` obtained through that mutex.
/// A linked node is kept alive by one strong reference owned by the deque,
/// released when the node is unlinked.
pub(crate) struct EvictionDeque<K, V> {
	/// Least recently used
	head: Option<NonNull<Node<K, V>>>,
	/// Most recently used
	tail: Option<NonNull<Node<K, V>>>,
	len: usize,
	marker: PhantomData<Arc<Node<K, V>>>,
}

// SAFETY: the deque owns strong references to `Send + Sync` nodes and is only
// ever accessed by the thread holding the eviction lock.
unsafe impl<K: Send + Sync, V: Send + Sync> Send for EvictionDeque<K, V> {}

impl<K, V> EvictionDeque<K, V> {
	pub(crate) fn new() -> Self {
		Self {
			head: None,
			tail: None,
			len: 0,
			marker: PhantomData,
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.len
	}

	#[cfg(test)]
	pub(crate) fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Whether `node` is currently linked into this deque.
	pub(crate) fn contains(&self, node: &Node<K, V>) -> bool {
		// SAFETY: links are only touched under the eviction lock, which the
		// caller holds by virtue of owning a reference to this deque.
		let links = unsafe { node.links() };
		links.prev.is_some() || links.next.is_some() || self.head == Some(NonNull::from(node))
	}

	/// Link `node` as the most recently used entry.
	pub(crate) fn push_back(&mut self, node: Arc<Node<K, V>>) {
		debug_assert!(!self.contains(&node), "node is already linked");

		// SAFETY: `Arc::into_raw` never returns null.
		let ptr = unsafe { NonNull::new_unchecked(Arc::into_raw(node) as *mut Node<K, V>) };

		// SAFETY: `ptr` was just leaked from a live Arc and the links of the
		// current tail belong to a node this deque keeps alive.
		unsafe {
			let links = ptr.as_ref().links();
			links.prev = self.tail;
			links.next = None;
			match self.tail {
				Some(tail) => tail.as_ref().links().next = Some(ptr),
				None => self.head = Some(ptr),
			}
		}
		self.tail = Some(ptr);
		self.len += 1;
	}

	/// Unlink `node`, handing back the deque's reference to it.
	///
	/// Returns `None` if the node is not linked.
	pub(crate) fn unlink(&mut self, node: &Node<K, V>) -> Option<Arc<Node<K, V>>> {
		if !self.contains(node) {
			return None;
		}
		let ptr = NonNull::from(node);

		// SAFETY: `node` is linked, so it and its neighbours are kept alive by
		// this deque, and the pointer was produced by `Arc::into_raw`.
		unsafe {
			let links = node.links();
			let prev = links.prev.take();
			let next = links.next.take();

			match prev {
				Some(prev) => prev.as_ref().links().next = next,
				None => self.head = next,
			}
			match next {
				Some(next) => next.as_ref().links().prev = prev,
				None => self.tail = prev,
			}
			self.len -= 1;

			Some(Arc::from_raw(ptr.as_ptr()))
		}
	}

	/// Move a linked node to the most recently used position.
	///
	/// Unlinked nodes are ignored: a read may be applied after its entry was
	/// removed, or before the entry's add has been applied.
	pub(crate) fn move_to_back(&mut self, node: &Node<K, V>) {
		if self.tail == Some(NonNull::from(node)) {
			return;
		}
		if let Some(node) = self.unlink(node) {
			self.push_back(node);
		}
	}

	/// Unlink and return the least recently used node.
	pub(crate) fn pop_front(&mut self) -> Option<Arc<Node<K, V>>> {
		let head = self.head?;
		// SAFETY: the head is linked and therefore alive.
		self.unlink(unsafe { head.as_ref() })
	}

	/// Unlink every node.
	pub(crate) fn clear(&mut self) {
		while self.pop_front().is_some() {}
	}

	/// Walk from least to most recently used.
	pub(crate) fn iter(&self) -> DequeIter<'_, K, V> {
		DequeIter {
			next: self.head,
			ascending: true,
			marker: PhantomData,
		}
	}

	/// Walk from most to least recently used.
	pub(crate) fn iter_rev(&self) -> DequeIter<'_, K, V> {
		DequeIter {
			next: self.tail,
			ascending: false,
			marker: PhantomData,
		}
	}
}

impl<K, V> Drop for EvictionDeque<K, V> {
	fn drop(&mut self) {
		self.clear();
	}
}

/// Borrowing iterator over the deque in either direction.
pub(crate) struct DequeIter<'a, K, V> {
	next: Option<NonNull<Node<K, V>>>,
	ascending: bool,
	marker: PhantomData<&'a EvictionDeque<K, V>>,
}

impl<'a, K, V> Iterator for DequeIter<'a, K, V> {
	type Item = &'a Node<K, V>;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next?;
		// SAFETY: the deque is borrowed for 'a, so no node can be unlinked
		// (and possibly freed) while this iterator is alive.
		let node: &'a Node<K, V> = unsafe { current.as_ref() };
		let links = unsafe { node.links() };
		self.next = if self.ascending {
			links.next
		} else {
			links.prev
		};
		Some(node)
	}
}
