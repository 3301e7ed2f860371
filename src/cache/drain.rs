//! Scheduling and draining of buffered policy tasks.
//!
//! Callers only ever enqueue tasks. The eviction deque and the weighted size
//! are mutated solely by the thread holding the eviction lock, which it takes
//! with `try_lock` on the hot path so that no caller ever waits for another
//! caller's bookkeeping.

use std::hash::Hash;
use std::sync::atomic::Ordering;

use tracing::trace;

use super::Cache;
use crate::buffer::Scheduled;
use crate::deque::EvictionDeque;
use crate::metrics::Counters;
use crate::node::Node;
use crate::task::{Task, TaskKind};

/// Whether buffered tasks need to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(super) enum DrainStatus {
	/// Nothing urgent is buffered.
	Idle = 0,
	/// A write is buffered and must be applied soon.
	Required = 1,
	/// A thread is draining right now.
	Processing = 2,
}

impl TryFrom<u8> for DrainStatus {
	type Error = u8;

	fn try_from(val: u8) -> Result<Self, Self::Error> {
		match val {
			0 => Ok(DrainStatus::Idle),
			1 => Ok(DrainStatus::Required),
			2 => Ok(DrainStatus::Processing),
			_ => Err(val),
		}
	}
}

/// State guarded by the eviction lock.
pub(super) struct EvictionState<K, V> {
	pub(super) deque: EvictionDeque<K, V>,
	/// Reordering window: slot `i` holds tasks with order `drained_order + i`
	slots: Box<[Vec<Task<K, V>>]>,
	/// One past the highest order applied through the window
	drained_order: u64,
}

impl<K, V> EvictionState<K, V> {
	pub(super) fn new(window: usize) -> Self {
		Self {
			deque: EvictionDeque::new(),
			slots: (0..window.max(1)).map(|_| Vec::new()).collect(),
			drained_order: 0,
		}
	}
}

/// What one pass over the buffers did.
#[derive(Debug, Default)]
struct DrainPass {
	applied: usize,
	evicted: usize,
	/// A buffer was left non-empty because its tasks ran past the window
	overflowed: bool,
}

impl<K, V> Cache<K, V>
where
	K: Hash + Eq + Clone + Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	/// Record a task and decide whether this caller should try to drain.
	pub(super) fn after_completion(&self, kind: TaskKind<K, V>) {
		let task = Task::new(self.next_order.fetch_add(1, Ordering::Relaxed), kind);

		let delayable = match self.buffers.schedule(task) {
			Scheduled::Write => {
				self.set_drain_status(DrainStatus::Required);
				false
			}
			Scheduled::Delayable => true,
			Scheduled::Urgent => false,
			Scheduled::Discarded => {
				trace!("discarded read task, buffer full");
				false
			}
		};

		if self.should_drain(delayable) {
			self.try_to_drain();
		}
		self.notify_listener();
	}

	fn drain_status(&self) -> DrainStatus {
		DrainStatus::try_from(self.drain_status.load(Ordering::Acquire)).unwrap_or(DrainStatus::Required)
	}

	fn set_drain_status(&self, status: DrainStatus) {
		self.drain_status.store(status as u8, Ordering::Release);
	}

	fn should_drain(&self, delayable: bool) -> bool {
		match self.drain_status() {
			DrainStatus::Processing => false,
			DrainStatus::Required => true,
			DrainStatus::Idle => !delayable,
		}
	}

	/// Drain if no other thread is already doing so; never blocks.
	fn try_to_drain(&self) {
		if let Some(mut state) = self.eviction.try_lock() {
			self.drain_locked(&mut state, false);
		}
	}

	/// Drain with the eviction lock held.
	///
	/// A partial drain makes one pass over the buffers; a full drain repeats
	/// passes until no buffer was cut short by the reordering window.
	pub(super) fn drain_locked(&self, state: &mut EvictionState<K, V>, full: bool) {
		self.set_drain_status(DrainStatus::Processing);
		loop {
			let pass = self.drain_pass(state);
			if pass.applied > 0 || pass.evicted > 0 {
				Counters::record(&self.counters.drains);
				trace!(
					applied = pass.applied,
					evicted = pass.evicted,
					drained_order = state.drained_order,
					linked = state.deque.len(),
					"drained buffers"
				);
			}
			if !(full && pass.overflowed) {
				break;
			}
		}
		// A write scheduled meanwhile leaves the status at Required.
		let _ = self.drain_status.compare_exchange(
			DrainStatus::Processing as u8,
			DrainStatus::Idle as u8,
			Ordering::AcqRel,
			Ordering::Relaxed,
		);
	}

	/// Move buffered tasks into the reordering window, apply them, then evict.
	fn drain_pass(&self, state: &mut EvictionState<K, V>) -> DrainPass {
		let EvictionState {
			deque,
			slots,
			drained_order,
		} = state;
		let last_slot = slots.len() - 1;
		let mut pass = DrainPass::default();
		let mut max_slot: Option<usize> = None;
		let mut highest_order: Option<u64> = None;

		for index in 0..self.buffers.count() {
			let mut taken = 0;
			while let Some(task) = self.buffers.pop(index) {
				taken += 1;
				let Some(distance) = task.order.checked_sub(*drained_order) else {
					// Older than the last window, apply in place.
					self.run_task(deque, task);
					pass.applied += 1;
					continue;
				};

				highest_order = highest_order.max(Some(task.order));
				match usize::try_from(distance) {
					Ok(slot) if slot < last_slot => {
						max_slot = max_slot.max(Some(slot));
						slots[slot].push(task);
					}
					_ => {
						// Past the window: chain onto the last slot, which still runs
						// in this pass and moves `drained_order` past the task. Only the
						// rest of this buffer waits for the next drain.
						max_slot = Some(last_slot);
						slots[last_slot].push(task);
						pass.overflowed = true;
						break;
					}
				}
			}
			self.buffers.consumed(index, taken);
		}

		if let Some(max_slot) = max_slot {
			for slot in &mut slots[..=max_slot] {
				for task in slot.drain(..) {
					self.run_task(deque, task);
					pass.applied += 1;
				}
			}
		}
		if let Some(highest) = highest_order {
			*drained_order = highest + 1;
		}

		pass.evicted = self.evict(deque);
		pass
	}

	/// Empty every buffer, applying writes in place and dropping reads.
	pub(super) fn apply_pending_writes(&self, state: &mut EvictionState<K, V>) {
		self.set_drain_status(DrainStatus::Processing);
		for index in 0..self.buffers.count() {
			let mut taken = 0;
			while let Some(task) = self.buffers.pop(index) {
				taken += 1;
				if task.is_write() {
					self.run_task(&mut state.deque, task);
				}
			}
			self.buffers.consumed(index, taken);
		}
		let _ = self.drain_status.compare_exchange(
			DrainStatus::Processing as u8,
			DrainStatus::Idle as u8,
			Ordering::AcqRel,
			Ordering::Relaxed,
		);
	}

	/// Apply one task to the deque and the weighted size.
	pub(super) fn run_task(&self, deque: &mut EvictionDeque<K, V>, task: Task<K, V>) {
		match task.kind {
			TaskKind::Read(node) => deque.move_to_back(&node),
			TaskKind::Add {
				node,
				weight,
			} => {
				self.weighted_size.fetch_add(weight, Ordering::Relaxed);
				// A removal may have been applied first; the node stays out.
				if node.is_alive() && !deque.contains(&node) {
					deque.push_back(node);
				}
			}
			TaskKind::Update {
				node,
				delta,
			} => {
				self.weighted_size.fetch_add(delta, Ordering::Relaxed);
				deque.move_to_back(&node);
			}
			TaskKind::Remove(node) => {
				deque.unlink(&node);
				self.make_dead(&node);
			}
		}
	}

	/// Kill `node` and release the weight it was charged.
	pub(super) fn make_dead(&self, node: &Node<K, V>) {
		if let Some(weight) = node.make_dead() {
			self.weighted_size.fetch_sub(weight, Ordering::Relaxed);
		}
	}

	fn has_overflowed(&self) -> bool {
		self.weighted_size.load(Ordering::Relaxed) > self.capacity.load(Ordering::Relaxed) as i64
	}

	/// Evict least recently used entries until within capacity.
	///
	/// Returns the number of entries evicted from the table.
	pub(super) fn evict(&self, deque: &mut EvictionDeque<K, V>) -> usize {
		let mut evicted = 0;
		while self.has_overflowed() {
			let Some(node) = deque.pop_front() else {
				break;
			};
			// The key may already map to a newer node; only evict this one.
			if self.table.remove_node(&node) {
				evicted += 1;
				Counters::record(&self.counters.evictions);
				if self.listener.is_some() {
					self.pending_notifications.push((node.key.clone(), node.value()));
				}
			}
			self.make_dead(&node);
		}
		evicted
	}

	/// Deliver queued eviction notifications. Must not hold the eviction lock.
	pub(super) fn notify_listener(&self) {
		let Some(listener) = &self.listener else {
			return;
		};
		while let Some((key, value)) = self.pending_notifications.pop() {
			listener.on_eviction(key, value);
		}
	}
}
