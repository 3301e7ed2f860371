use std::cmp::Ordering;
use std::sync::Arc;

/// Lifecycle of an entry, encoded in the sign of its weight.
///
/// Transitions are one-way: `Alive -> Retired -> Dead`, or `Alive -> Dead`
/// when an entry is evicted straight out of the eviction deque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
	/// Present in the table and (once its add task is applied) in the deque.
	Alive,
	/// Removed from the table, still waiting to be unlinked from the deque.
	Retired,
	/// Absent from both structures.
	Dead,
}

/// A stored value together with the capacity it consumes.
///
/// `weight > 0` is alive, `weight < 0` is retired and `weight == 0` is dead.
/// Instances are immutable; state changes swap in a new `WeightedValue`.
#[derive(Debug)]
pub(crate) struct WeightedValue<V> {
	pub(crate) value: Arc<V>,
	pub(crate) weight: i64,
}

impl<V> WeightedValue<V> {
	pub(crate) fn new(value: Arc<V>, weight: i64) -> Self {
		Self {
			value,
			weight,
		}
	}

	pub(crate) fn state(&self) -> State {
		match self.weight.cmp(&0) {
			Ordering::Greater => State::Alive,
			Ordering::Less => State::Retired,
			Ordering::Equal => State::Dead,
		}
	}

	#[inline]
	pub(crate) fn is_alive(&self) -> bool {
		self.weight > 0
	}

	/// The same value with its weight negated.
	pub(crate) fn retired(&self) -> Self {
		Self::new(Arc::clone(&self.value), -self.weight.abs())
	}

	/// The same value with zero weight.
	pub(crate) fn dead(&self) -> Self {
		Self::new(Arc::clone(&self.value), 0)
	}

	/// Capacity this value was (or still is) charged against the cache.
	pub(crate) fn charged(&self) -> i64 {
		self.weight.abs()
	}
}

impl<V: PartialEq> WeightedValue<V> {
	/// Identity first, then equality.
	pub(crate) fn contains(&self, other: &V) -> bool {
		std::ptr::eq(Arc::as_ptr(&self.value), other) || *self.value == *other
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_from_weight_sign() {
		let alive = WeightedValue::new(Arc::new("a"), 3);
		assert_eq!(alive.state(), State::Alive);
		assert!(alive.is_alive());

		let retired = alive.retired();
		assert_eq!(retired.state(), State::Retired);
		assert_eq!(retired.weight, -3);
		assert_eq!(retired.charged(), 3);

		let dead = retired.dead();
		assert_eq!(dead.state(), State::Dead);
		assert_eq!(dead.charged(), 0);
		assert_eq!(*dead.value, "a");
	}

	#[test]
	fn test_retiring_twice_keeps_weight_negative() {
		let retired = WeightedValue::new(Arc::new(1u8), 5).retired().retired();
		assert_eq!(retired.weight, -5);
	}

	#[test]
	fn test_contains_by_identity_and_equality() {
		let value = Arc::new(String::from("x"));
		let weighted = WeightedValue::new(Arc::clone(&value), 1);

		assert!(weighted.contains(&value));
		assert!(weighted.contains(&String::from("x")));
		assert!(!weighted.contains(&String::from("y")));
	}
}
