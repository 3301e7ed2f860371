use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;

use crate::task::Task;

/// Reads recorded in a buffer before it asks for a drain.
pub(crate) const BUFFER_THRESHOLD: usize = 16;

/// Tasks queued in a buffer after which new reads are discarded.
pub(crate) const MAXIMUM_BUFFER_SIZE: usize = 1 << 20;

static NEXT_PROBE: AtomicUsize = AtomicUsize::new(0);

thread_local! {
	/// Per-thread stripe selector, handed out round-robin.
	static PROBE: usize = NEXT_PROBE.fetch_add(1, Ordering::Relaxed);
}

/// Outcome of recording a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheduled {
	/// A write was queued; a drain is now required.
	Write,
	/// A read was queued without crossing the threshold.
	Delayable,
	/// A read was queued and took the buffer past its threshold.
	Urgent,
	/// The buffer was full, the read was dropped.
	Discarded,
}

/// Striped lock-free queues of pending tasks.
///
/// Each thread maps to one stripe, so threads rarely contend on the same queue.
pub(crate) struct Buffers<K, V> {
	queues: Box<[SegQueue<Task<K, V>>]>,
	/// Approximate number of queued tasks per stripe
	lengths: Box<[AtomicUsize]>,
	mask: usize,
}

impl<K, V> Buffers<K, V> {
	/// Create `count` stripes, rounded up to a power of two.
	pub(crate) fn new(count: usize) -> Self {
		let count = count.max(1).next_power_of_two();
		Self {
			queues: (0..count).map(|_| SegQueue::new()).collect(),
			lengths: (0..count).map(|_| AtomicUsize::new(0)).collect(),
			mask: count - 1,
		}
	}

	pub(crate) fn count(&self) -> usize {
		self.queues.len()
	}

	/// Stripe for the calling thread. Stable for a thread, but not guaranteed.
	fn current_index(&self) -> usize {
		PROBE.try_with(|probe| *probe).unwrap_or(0) & self.mask
	}

	/// Record `task` in the caller's stripe.
	///
	/// Writes are always queued. Reads are dropped once the stripe holds more
	/// than `MAXIMUM_BUFFER_SIZE` tasks; losing a recency hint is harmless.
	pub(crate) fn schedule(&self, task: Task<K, V>) -> Scheduled {
		let index = self.current_index();
		let buffered = self.lengths[index].fetch_add(1, Ordering::AcqRel) + 1;

		if task.is_write() {
			self.queues[index].push(task);
			return Scheduled::Write;
		}

		if buffered <= MAXIMUM_BUFFER_SIZE {
			self.queues[index].push(task);
			// Only the read that crosses the threshold asks for a drain.
			if buffered == BUFFER_THRESHOLD + 1 {
				Scheduled::Urgent
			} else {
				Scheduled::Delayable
			}
		} else {
			self.lengths[index].fetch_sub(1, Ordering::AcqRel);
			Scheduled::Discarded
		}
	}

	/// Take the oldest queued task of stripe `index`.
	pub(crate) fn pop(&self, index: usize) -> Option<Task<K, V>> {
		self.queues[index].pop()
	}

	/// Account for `count` tasks taken out of stripe `index`.
	pub(crate) fn consumed(&self, index: usize, count: usize) {
		if count > 0 {
			self.lengths[index].fetch_sub(count, Ordering::AcqRel);
		}
	}

	#[cfg(test)]
	pub(crate) fn queued(&self, index: usize) -> usize {
		self.lengths[index].load(Ordering::Acquire)
	}
}
