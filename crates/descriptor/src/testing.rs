//! Testing utilities for the descriptor allocator
//!
//! [`RecordingBackend`] stands in for a device: pools are plain ids, every
//! whole-pool call is recorded, and allocation outcomes can be scripted.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::backend::{AllocFailure, PoolBackend, PoolCreateInfo, PoolFlags};
use crate::config::DescriptorType;
use crate::error::{Error, Result};

/// Pool id handed out by [`RecordingBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockPool(pub u64);

/// Descriptor set handed out by [`RecordingBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSet {
    pub pool: MockPool,
    /// Position of this set within its pool since the last reset
    pub index: u32,
    pub bindings: u32,
}

/// Record of a whole-pool call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create {
        pool: MockPool,
        max_sets: u32,
        sizes: Vec<(DescriptorType, u32)>,
        flags: PoolFlags,
    },
    Reset(MockPool),
    Destroy(MockPool),
}

#[derive(Debug, Default)]
struct Recorder {
    next_id: u64,
    calls: Vec<BackendCall>,
    /// Outcomes for the next `allocate` calls, consumed front to back
    script: VecDeque<AllocFailure>,
    /// Sets handed out per pool since its last reset
    used: HashMap<MockPool, u32>,
    /// Sets a pool can hold before reporting exhaustion; `None` is unbounded
    sets_per_pool: Option<u32>,
    fail_create: Option<String>,
}

/// In-memory pool primitive that records every call
///
/// The layout is the number of bindings in the set; it only ends up in
/// the returned [`MockSet`].
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: Mutex<Recorder>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pool reports exhaustion after `sets` allocations until reset.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_sets_per_pool(self, sets: u32) -> Self {
        self.inner.lock().sets_per_pool = Some(sets);
        self
    }

    /// Fail the next `allocate` calls with these outcomes, in order.
    pub fn script(&self, failures: impl IntoIterator<Item = AllocFailure>) {
        self.inner.lock().script.extend(failures);
    }

    /// Make the next `create_pool` fail.
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        self.inner.lock().fail_create = Some(reason.into());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_history(&self) {
        self.inner.lock().calls.clear();
    }

    /// Pools created so far, in creation order
    pub fn created(&self) -> Vec<MockPool> {
        self.filter_calls(|call| match call {
            BackendCall::Create { pool, .. } => Some(*pool),
            _ => None,
        })
    }

    pub fn resets(&self) -> Vec<MockPool> {
        self.filter_calls(|call| match call {
            BackendCall::Reset(pool) => Some(*pool),
            _ => None,
        })
    }

    pub fn destroyed(&self) -> Vec<MockPool> {
        self.filter_calls(|call| match call {
            BackendCall::Destroy(pool) => Some(*pool),
            _ => None,
        })
    }

    /// Number of sets currently carved out of `pool`
    pub fn sets_in(&self, pool: MockPool) -> u32 {
        self.inner.lock().used.get(&pool).copied().unwrap_or(0)
    }

    fn filter_calls(&self, f: impl Fn(&BackendCall) -> Option<MockPool>) -> Vec<MockPool> {
        self.inner.lock().calls.iter().filter_map(f).collect()
    }
}

impl PoolBackend for RecordingBackend {
    type Pool = MockPool;
    type Layout = u32;
    type Item = MockSet;

    fn create_pool(&self, info: &PoolCreateInfo<'_>) -> Result<MockPool> {
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fail_create.take() {
            return Err(Error::pool_creation(reason));
        }

        let pool = MockPool(inner.next_id);
        inner.next_id += 1;
        inner.calls.push(BackendCall::Create {
            pool,
            max_sets: info.max_sets,
            sizes: info.sizes.to_vec(),
            flags: info.flags,
        });
        Ok(pool)
    }

    fn reset_pool(&self, pool: MockPool) {
        let mut inner = self.inner.lock();
        inner.used.remove(&pool);
        inner.calls.push(BackendCall::Reset(pool));
    }

    fn destroy_pool(&self, pool: MockPool) {
        let mut inner = self.inner.lock();
        inner.used.remove(&pool);
        inner.calls.push(BackendCall::Destroy(pool));
    }

    fn allocate(&self, pool: MockPool, layout: &u32) -> std::result::Result<MockSet, AllocFailure> {
        let mut inner = self.inner.lock();
        if let Some(failure) = inner.script.pop_front() {
            return Err(failure);
        }

        let limit = inner.sets_per_pool;
        let used = inner.used.entry(pool).or_insert(0);
        if limit.is_some_and(|limit| *used >= limit) {
            return Err(AllocFailure::OutOfPoolMemory);
        }

        let index = *used;
        *used += 1;
        Ok(MockSet {
            pool,
            index,
            bindings: *layout,
        })
    }
}
