//! Benchmarks for the descriptor pool allocator.
//!
//! Measures:
//! - acquire/release round-trip against a warm slot
//! - allocate through a handle, with and without exhaustion
//! - a full frame cycle with many handles per frame

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use vke_descriptor::ResourcePoolAllocator;
use vke_descriptor::testing::RecordingBackend;

fn acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptor/acquire");

    group.bench_function("warm_slot", |b| {
        let allocator = ResourcePoolAllocator::new(RecordingBackend::new());
        drop(allocator.acquire().unwrap());

        b.iter(|| {
            let handle = allocator.acquire().unwrap();
            black_box(handle.pool());
        });
    });

    group.bench_function("allocate_one", |b| {
        let allocator = ResourcePoolAllocator::new(RecordingBackend::new());
        let mut handle = allocator.acquire().unwrap();

        b.iter(|| black_box(handle.allocate(black_box(&4)).unwrap()));
    });

    group.bench_function("allocate_with_exhaustion", |b| {
        let mut allocator =
            ResourcePoolAllocator::new(RecordingBackend::new().with_sets_per_pool(1));

        b.iter(|| {
            let mut handle = allocator.acquire().unwrap();
            black_box(handle.allocate(&4).unwrap());
            black_box(handle.allocate(&4).unwrap());
            drop(handle);
            allocator.advance_frame();
            allocator.backend().clear_history();
        });
    });

    group.finish();
}

fn frame_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptor/frame_cycle");

    for handles_per_frame in [1usize, 16, 128] {
        group.bench_with_input(
            BenchmarkId::new("handles", handles_per_frame),
            &handles_per_frame,
            |b, &count| {
                let mut allocator =
                    ResourcePoolAllocator::with_frame_slots(RecordingBackend::new(), 3).unwrap();

                b.iter(|| {
                    let mut handles = Vec::with_capacity(count);
                    for _ in 0..count {
                        let mut handle = allocator.acquire().unwrap();
                        black_box(handle.allocate(&2).unwrap());
                        handles.push(handle);
                    }
                    drop(handles);
                    allocator.advance_frame();
                    allocator.backend().clear_history();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, acquire_release, frame_cycle);
criterion_main!(benches);
