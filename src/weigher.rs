use std::sync::Arc;

use crate::error::{CacheError, Result};

/// Computes how many capacity units an entry consumes.
///
/// Must be pure and cheap: it runs on the calling thread of every write.
/// A weight of zero is a contract violation and makes the write fail with
/// [`CacheError::InvalidArgument`].
///
/// Any `Fn(&K, &V) -> u32` closure is a weigher:
///
/// ```
/// use weighted_lru::CacheBuilder;
///
/// let cache = CacheBuilder::<u64, String>::new()
///     .maximum_weighted_capacity(1024)
///     .weigher(|_key: &u64, value: &String| value.len().max(1) as u32)
///     .build()
///     .unwrap();
/// # drop(cache);
/// ```
pub trait Weigher<K, V>: Send + Sync {
	/// Weight of the entry; must be at least 1.
	fn weigh(&self, key: &K, value: &V) -> u32;
}

impl<K, V, F> Weigher<K, V> for F
where
	F: Fn(&K, &V) -> u32 + Send + Sync,
{
	fn weigh(&self, key: &K, value: &V) -> u32 {
		self(key, value)
	}
}

/// Ready-made weighers.
pub struct Weighers;

impl Weighers {
	/// Every entry weighs 1, bounding the cache by entry count.
	pub fn singleton() -> Singleton {
		Singleton
	}

	/// Weight is the byte length of the value.
	///
	/// Empty values weigh 0 and are rejected.
	pub fn byte_len() -> ByteLen {
		ByteLen
	}
}

/// See [`Weighers::singleton`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Singleton;

impl<K, V> Weigher<K, V> for Singleton {
	#[inline]
	fn weigh(&self, _key: &K, _value: &V) -> u32 {
		1
	}
}

/// See [`Weighers::byte_len`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteLen;

impl<K, V: AsRef<[u8]>> Weigher<K, V> for ByteLen {
	fn weigh(&self, _key: &K, value: &V) -> u32 {
		u32::try_from(value.as_ref().len()).unwrap_or(u32::MAX)
	}
}

/// Weigher wrapper that fails fast on a zero weight.
pub(crate) struct BoundedWeigher<K, V> {
	inner: Arc<dyn Weigher<K, V>>,
}

impl<K, V> BoundedWeigher<K, V> {
	pub(crate) fn new(inner: Arc<dyn Weigher<K, V>>) -> Self {
		Self {
			inner,
		}
	}

	pub(crate) fn weigh(&self, key: &K, value: &V) -> Result<i64> {
		match self.inner.weigh(key, value) {
			0 => Err(CacheError::InvalidArgument(
				"weigher returned a weight of 0, expected at least 1".to_string(),
			)),
			weight => Ok(i64::from(weight)),
		}
	}
}
