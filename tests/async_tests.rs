//! Tests for async usage patterns.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use weighted_lru::{Cache, CacheBuilder};

#[derive(Clone, Debug, PartialEq)]
struct Session {
	user: String,
}

#[tokio::test]
async fn test_arc_held_across_await() {
	let cache = Arc::new(Cache::new(10));

	let session = Session {
		user: "async test".to_string(),
	};
	cache.put(1u64, session.clone()).unwrap();

	// The Arc stays valid even if the entry is evicted meanwhile.
	if let Some(held) = cache.get(&1) {
		cache.remove(&1);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;

		assert_eq!(*held, session);
	}
	assert!(!cache.contains_key(&1));
}

#[tokio::test]
async fn test_get_clone_in_async() {
	let cache = Arc::new(Cache::new(10));

	let session = Session {
		user: "clone test".to_string(),
	};
	cache.put(2u64, session.clone()).unwrap();

	if let Some(cloned) = cache.get_clone(&2) {
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;

		assert_eq!(cloned, session);
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_tasks() {
	let cache = Arc::new(Cache::new(1000));

	for i in 0..100u64 {
		cache
			.put(
				i,
				Session {
					user: format!("user-{}", i),
				},
			)
			.unwrap();
	}

	let mut handles = vec![];

	for task_id in 0..10u64 {
		let cache = Arc::clone(&cache);
		handles.push(tokio::spawn(async move {
			for i in 0..100 {
				let key = (task_id * 100 + i) % 100;

				if let Some(session) = cache.get(&key) {
					tokio::time::sleep(tokio::time::Duration::from_micros(1)).await;
					assert_eq!(session.user, format!("user-{}", key));
				}
			}
		}));
	}

	for handle in handles {
		handle.await.unwrap();
	}

	cache.run_pending_tasks();
	assert_eq!(cache.len(), 100);
	assert_eq!(cache.weighted_size(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_writers_stay_bounded() {
	let evicted = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&evicted);
	let cache = Arc::new(
		CacheBuilder::<u64, u64>::new()
			.maximum_weighted_capacity(50)
			.listener(move |_: u64, _: Arc<u64>| {
				counter.fetch_add(1, Ordering::Relaxed);
			})
			.build()
			.unwrap(),
	);

	let tasks: Vec<_> = (0..20u64)
		.map(|task_id| {
			let cache = Arc::clone(&cache);
			tokio::spawn(async move {
				for i in 0..20 {
					cache.put(task_id * 20 + i, i).unwrap();
					tokio::task::yield_now().await;
				}
			})
		})
		.collect();

	for task in tasks {
		task.await.unwrap();
	}

	cache.run_pending_tasks();
	assert_eq!(cache.len(), 50);
	assert_eq!(cache.weighted_size(), 50);
	assert_eq!(evicted.load(Ordering::Relaxed), 400 - 50);
}
