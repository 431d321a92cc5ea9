//! Many threads acquiring, allocating, and releasing against one allocator.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use vke_descriptor::{AllocatorConfig, ResourcePoolAllocator};
use vke_descriptor::testing::{MockPool, RecordingBackend};

const THREADS: usize = 8;
const ITERATIONS: usize = 200;
const ROUNDS: usize = 6;

#[test]
fn concurrent_acquire_release_keeps_pools_exclusive() {
    let backend = Arc::new(RecordingBackend::new().with_sets_per_pool(4));
    let config = AllocatorConfig::default()
        .with_frame_slots(3)
        .with_max_exhaustion_retries(64);
    let mut allocator = ResourcePoolAllocator::with_config(Arc::clone(&backend), config).unwrap();

    for round in 0..ROUNDS {
        thread::scope(|s| {
            for worker in 0..THREADS {
                let allocator = &allocator;
                s.spawn(move || {
                    for i in 0..ITERATIONS {
                        let mut handle = allocator.acquire().unwrap();
                        let bindings = u32::try_from(worker + i).unwrap();
                        let set = handle.allocate(&bindings).unwrap();
                        assert_eq!(Some(set.pool), handle.pool());
                        assert_eq!(set.bindings, bindings);
                    }
                });
            }
        });

        assert_eq!(allocator.stats().live_handles, 0, "round {round}");

        let inventory = allocator.inventory();
        let mut seen = HashSet::new();
        for pool in inventory.pools() {
            assert!(seen.insert(pool), "pool {pool:?} sits in two places");
        }
        let created: HashSet<MockPool> = backend.created().into_iter().collect();
        assert_eq!(seen, created);

        allocator.advance_frame();
    }

    let stats = allocator.stats();
    let acquired = (THREADS * ITERATIONS * ROUNDS) as u64;
    assert_eq!(stats.acquisitions(), acquired + stats.exhaustion_retries);
    assert_eq!(stats.releases, acquired);
    assert_eq!(stats.exhausted_releases, stats.exhaustion_retries);
    assert_eq!(stats.retry_limit_hits, 0);
    assert_eq!(stats.created as usize, backend.created().len());
    assert!(stats.peak_live_handles <= THREADS);
}

#[test]
fn handles_released_on_worker_threads_return_to_their_slots() {
    let backend = Arc::new(RecordingBackend::new());
    let mut allocator = ResourcePoolAllocator::with_frame_slots(Arc::clone(&backend), 2).unwrap();

    let first: Vec<_> = (0..4).map(|_| allocator.acquire().unwrap()).collect();
    allocator.advance_frame();
    let second: Vec<_> = (0..4).map(|_| allocator.acquire().unwrap()).collect();

    thread::scope(|s| {
        s.spawn(move || drop(first));
        s.spawn(move || drop(second));
    });

    let inventory = allocator.inventory();
    assert_eq!(inventory.slots[0].usable().len(), 4);
    assert_eq!(inventory.slots[1].usable().len(), 4);
    assert_eq!(backend.created().len(), 8);
}
