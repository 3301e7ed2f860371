//! # Weighted LRU
//!
//! A concurrent, in-memory map bounded by total weight, with:
//! - **Weighted capacity** (each entry costs what its [`Weigher`] says, 1 by default)
//! - **Least-recently-used eviction** of whole entries
//! - **Non-blocking reads and writes** on a sharded hash table
//! - **Amortized bookkeeping**: recency updates are buffered and applied in batches
//!   by whichever thread wins a `try_lock`
//! - **Eviction notifications** delivered outside of any lock
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use weighted_lru::CacheBuilder;
//!
//! let cache = CacheBuilder::<u64, String>::new()
//!     .maximum_weighted_capacity(16)
//!     .weigher(|_id: &u64, name: &String| name.len().max(1) as u32)
//!     .listener(|id: u64, name: Arc<String>| println!("evicted {id}: {name}"))
//!     .build()
//!     .unwrap();
//!
//! cache.put(1, "alice".to_string()).unwrap();
//! cache.put(2, "bob".to_string()).unwrap();
//!
//! // Values are handed out as `Arc`s, no lock is held afterwards
//! if let Some(name) = cache.get(&1) {
//!     assert_eq!(name.as_str(), "alice");
//! }
//! ```
//!
//! ## Async Usage
//!
//! Every method returns without awaiting anything, and returned values are
//! `Arc`s, so it is fine to keep them across `.await` points:
//!
//! ```rust,ignore
//! async fn render(cache: Arc<Cache<u64, String>>, id: u64) {
//!     if let Some(name) = cache.get(&id) {
//!         send_greeting(&name).await;
//!     }
//! }
//! ```
//!
//! ## Thread Safety
//!
//! The cache is `Send + Sync` and can be shared across threads via `Arc`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use weighted_lru::Cache;
//!
//! let cache = Arc::new(Cache::new(1024));
//!
//! let handles: Vec<_> = (0..4u64)
//!     .map(|i| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             cache.put(i, i * 2).unwrap();
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(cache.len(), 4);
//! ```

mod buffer;
mod builder;
mod cache;
mod deque;
mod error;
mod iter;
mod listener;
mod metrics;
mod node;
mod table;
mod task;
mod weigher;
mod weighted;

pub use builder::CacheBuilder;
pub use cache::{Cache, MAXIMUM_CAPACITY};
pub use error::{CacheError, Result};
pub use iter::{Iter, Keys, Values};
pub use listener::EvictionListener;
pub use metrics::CacheMetrics;
pub use weigher::{ByteLen, Singleton, Weigher, Weighers};
