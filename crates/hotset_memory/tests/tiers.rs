// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the in-memory tiers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use hotset_memory::{InMemorySnapshotTier, LocalCache, LocalCacheBuilder};
use hotset_tier::{CacheEntry, LocalTier, SnapshotTier, TtlJitter};
use tick::Clock;

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn local_get_returns_none_for_missing_key() {
    block_on(async {
        let cache = LocalCache::<String, i32>::with_capacity(10);
        assert!(cache.get(&"missing".to_string()).await.is_none());
    });
}

#[test]
fn local_insert_invalidate() {
    block_on(async {
        let cache = LocalCacheBuilder::<String, i32>::new()
            .max_capacity(10)
            .initial_capacity(4)
            .name("local")
            .build();

        cache.insert(&"key".to_string(), CacheEntry::new(42)).await;
        assert_eq!(cache.get(&"key".to_string()).await.map(CacheEntry::into_value), Some(42));

        cache.sync().await;
        assert_eq!(cache.len(), Some(1));

        cache.invalidate(&"key".to_string()).await;
        assert!(cache.get(&"key".to_string()).await.is_none());

        cache.sync().await;
        assert_eq!(cache.is_empty(), Some(true));
    });
}

#[test]
fn local_capacity_is_bounded() {
    block_on(async {
        let cache = LocalCache::<u32, u32>::with_capacity(16);
        for i in 0..1_000 {
            cache.insert(&i, CacheEntry::new(i)).await;
        }

        cache.sync().await;
        assert!(cache.len().unwrap() <= 16);
    });
}

#[tokio::test]
async fn local_clones_share_storage() {
    let cache = LocalCache::<u32, &'static str>::with_capacity(8);
    let clone = cache.clone();

    cache.insert(&1, CacheEntry::new("one")).await;
    assert_eq!(clone.get(&1).await.map(CacheEntry::into_value), Some("one"));
}

#[test]
fn snapshot_batch_is_visible_all_at_once() {
    const BATCH: usize = 256;

    let tier = InMemorySnapshotTier::<usize, usize>::new(Clock::new_frozen());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let tier = tier.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut observed = Vec::new();
            while !done.load(Ordering::Acquire) {
                observed.push(tier.len());
            }
            observed
        })
    };

    let batch: HashMap<usize, usize> = (0..BATCH).map(|i| (i, i)).collect();
    block_on(tier.batch_insert(batch, TtlJitter::fixed(Duration::from_secs(60)))).unwrap();
    done.store(true, Ordering::Release);

    let observed = reader.join().expect("reader panicked");
    assert!(observed.iter().all(|len| *len == 0 || *len == BATCH), "partial batch observed");
    assert_eq!(tier.len(), BATCH);
}

#[test]
fn snapshot_miss_and_overwrite() {
    let tier = InMemorySnapshotTier::new(Clock::new_frozen());

    block_on(async {
        assert_eq!(tier.get(&"k").await.unwrap(), None::<i32>);

        tier.insert(&"k", 1, Duration::from_secs(1)).await.unwrap();
        tier.batch_insert(HashMap::from([("k", 2)]), TtlJitter::fixed(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(tier.get(&"k").await.unwrap(), Some(2));
    });

    assert_eq!(tier.len(), 1);
}
