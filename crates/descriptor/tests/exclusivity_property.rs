//! Property tests for pool placement invariants.
//!
//! After any sequence of acquire / release / allocate / advance operations:
//! - every pool sits in at most one place (an idle bucket, the recycle bin,
//!   or a live handle)
//! - every pool ever created is accounted for
//! - a pool is only reset while its slot is current and nobody holds it

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use vke_descriptor::testing::{MockPool, RecordingBackend};
use vke_descriptor::{AllocFailure, AllocationHandle, AllocatorConfig, ResourcePoolAllocator};

#[derive(Debug, Clone)]
enum Op {
    Acquire,
    /// Release the handle at this position (modulo live count)
    Release(usize),
    /// Allocate from the handle at this position; `true` forces one exhaustion first
    Allocate(usize, bool),
    /// Overwrite handle `a` with handle `b`
    MoveOver(usize, usize),
    Advance,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Acquire),
        2 => any::<usize>().prop_map(Op::Release),
        3 => (any::<usize>(), any::<bool>()).prop_map(|(i, e)| Op::Allocate(i, e)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::MoveOver(a, b)),
        2 => Just(Op::Advance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pools_never_in_two_places(
        slots in 1usize..5,
        sets_per_pool in 1u32..4,
        ops in proptest::collection::vec(op(), 1..80),
    ) {
        let backend = Arc::new(RecordingBackend::new().with_sets_per_pool(sets_per_pool));
        let mut allocator = ResourcePoolAllocator::with_config(
            Arc::clone(&backend),
            // Full pools can pile up in a slot's usable bucket; keep the cap
            // out of reach so every allocate lands.
            AllocatorConfig::default()
                .with_frame_slots(slots)
                .with_max_exhaustion_retries(1024),
        )
        .unwrap();
        let mut handles: Vec<AllocationHandle<Arc<RecordingBackend>>> = Vec::new();

        for op in ops {
            match op {
                Op::Acquire => handles.push(allocator.acquire().unwrap()),
                Op::Release(i) if !handles.is_empty() => {
                    let i = i % handles.len();
                    handles.swap_remove(i).release();
                }
                Op::Allocate(i, force) if !handles.is_empty() => {
                    let i = i % handles.len();
                    if force {
                        backend.script([AllocFailure::FragmentedPool]);
                    }
                    let set = handles[i].allocate(&1).unwrap();
                    prop_assert_eq!(Some(set.pool), handles[i].pool());
                }
                Op::MoveOver(a, b) if handles.len() >= 2 => {
                    let a = a % handles.len();
                    let b = b % handles.len();
                    if a != b {
                        let source = std::mem::take(&mut handles[b]);
                        handles[a] = source;
                        handles.swap_remove(b);
                    }
                }
                Op::Advance => {
                    let resets_before = backend.resets().len();
                    allocator.advance_frame();
                    let held: HashSet<MockPool> =
                        handles.iter().filter_map(AllocationHandle::pool).collect();
                    for pool in &backend.resets()[resets_before..] {
                        prop_assert!(!held.contains(pool), "reset a pool held by a live handle");
                    }
                }
                _ => {}
            }

            let inventory = allocator.inventory();
            let mut seen = HashSet::new();
            for pool in inventory.pools().chain(handles.iter().filter_map(AllocationHandle::pool)) {
                prop_assert!(seen.insert(pool), "pool {:?} found twice", pool);
            }

            let created: HashSet<MockPool> = backend.created().into_iter().collect();
            prop_assert_eq!(&seen, &created);
            prop_assert_eq!(allocator.stats().live_handles, handles.len());
        }

        drop(handles);
        let created = backend.created().len();
        drop(allocator);
        prop_assert_eq!(backend.destroyed().len(), created);
    }
}
