use std::sync::Arc;

/// Notified after an entry has been evicted for capacity.
///
/// Called at most once per evicted entry, on a thread that has already
/// released the eviction lock and after the entry is unreachable from the
/// cache. Explicit removals and `clear` are not reported.
///
/// Implementations must not panic: a panic propagates to whichever cache
/// caller happened to deliver the notification, and the notifications queued
/// behind it wait for the next delivery.
///
/// Any `Fn(K, Arc<V>)` closure is a listener.
pub trait EvictionListener<K, V>: Send + Sync {
	fn on_eviction(&self, key: K, value: Arc<V>);
}

impl<K, V, F> EvictionListener<K, V> for F
where
	F: Fn(K, Arc<V>) + Send + Sync,
{
	fn on_eviction(&self, key: K, value: Arc<V>) {
		self(key, value)
	}
}
