use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weighted_lru::CacheBuilder;

/// Example showing weight-bounded eviction: entries cost what their payload
/// weighs, so one large profile can push out several small ones.
///
/// Run with `RUST_LOG=weighted_lru=trace` to watch the drains.

#[derive(Clone, Debug, PartialEq)]
struct UserProfile {
	name: String,
	bio: String,
}

fn main() {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "weighted_lru=debug".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	// Weigh each profile by the bytes it holds, 500 bytes in total
	let cache = CacheBuilder::<u64, UserProfile>::new()
		.maximum_weighted_capacity(500)
		.weigher(|_id: &u64, profile: &UserProfile| (profile.name.len() + profile.bio.len()).max(1) as u32)
		.listener(|id: u64, profile: Arc<UserProfile>| println!("  evicted {} ({})", id, profile.name))
		.build()
		.expect("capacity is set");

	cache
		.put(
			1,
			UserProfile {
				name: "Alice".to_string(),
				bio: "x".repeat(40),
			},
		)
		.expect("weight is positive");

	// Keep Alice hot while the cache fills up
	for i in 2..20 {
		cache
			.put(
				i,
				UserProfile {
					name: format!("User {}", i),
					bio: "y".repeat(30),
				},
			)
			.expect("weight is positive");
		cache.get(&1);
	}

	// A single large profile displaces several cold ones
	println!("Inserting a large profile:");
	cache
		.put(
			100,
			UserProfile {
				name: "Bulky".to_string(),
				bio: "z".repeat(300),
			},
		)
		.expect("weight is positive");
	cache.run_pending_tasks();

	if cache.contains_key(&1) {
		println!("✓ Frequently read user survived eviction");
	} else {
		println!("✗ Frequently read user was evicted (unexpected)");
	}

	println!("\nHottest entries:");
	for (id, profile) in cache.descending_map_with_limit(3) {
		println!("  {}: {}", id, profile.name);
	}

	let metrics = cache.metrics();
	println!("\nCache stats:");
	println!("  Entries: {}", cache.len());
	println!("  Weighted size: {} / {}", cache.weighted_size(), cache.capacity());
	println!("  Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
	println!("  Evictions: {}", metrics.evictions);
}
