//! Frame-pipelined pool allocator
//!
//! # Pool flow
//!
//! ```text
//!                      acquire()                 release / drop
//!  recycle bin ───────┐                       ┌──▶ slots[handle.slot].usable
//!  slots[cur].usable ─┼──▶ AllocationHandle ──┤
//!  create_pool() ─────┘          │            └──▶ slots[handle.slot].exhausted
//!                                │ (allocate hit exhaustion: retire + re-acquire)
//!
//!  advance_frame(): cur = (cur + 1) % N
//!                   slots[cur].{exhausted, usable} ── reset ──▶ recycle bin
//! ```
//!
//! Every idle pool sits in exactly one place: the recycle bin or one bucket of
//! one slot. Pools bound to a live handle sit nowhere until released.
//!
//! # Caller contract
//!
//! A slot is reset when it becomes current again, i.e. after `N - 1` further
//! [`advance_frame`](ResourcePoolAllocator::advance_frame) calls. Items
//! allocated through a handle drawn in slot `k` stay valid only until then;
//! nothing inside the allocator tracks item lifetimes.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::backend::{PoolBackend, PoolCreateInfo, PoolFlags};
use crate::config::{AllocatorConfig, DescriptorType, validate_multiplier};
use crate::error::Result;
use crate::handle::AllocationHandle;
use crate::stats::{AcquireSource, AllocatorStats, StatsSnapshot};
use crate::storage::{FrameSlotStorage, PoolInventory};

/// Slot whose pools are created with [`PoolFlags::FREE_DESCRIPTOR_SET`]
pub const STATIC_SLOT: usize = 0;

/// Mutable state, only touched under [`Shared::state`]
struct State<P> {
    frame_index: usize,
    slots: Box<[FrameSlotStorage<P>]>,
    /// Pools already reset and ready for any slot
    recycle_bin: Vec<P>,
    config: AllocatorConfig,
}

/// State shared between the allocator and the weak links held by handles
pub(crate) struct Shared<B: PoolBackend> {
    backend: B,
    state: Mutex<State<B::Pool>>,
    pub(crate) stats: AllocatorStats,
}

impl<B: PoolBackend> Shared<B> {
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Pop or create a pool for the current frame slot.
    pub(crate) fn acquire_pool(&self) -> Result<(B::Pool, usize)> {
        let mut state = self.state.lock();
        let slot = state.frame_index;

        let (pool, source) = if let Some(pool) = state.recycle_bin.pop() {
            (pool, AcquireSource::RecycleBin)
        } else if let Some(pool) = state.slots[slot].pop_usable() {
            (pool, AcquireSource::Usable)
        } else {
            (self.create_pool(&state.config, slot)?, AcquireSource::Created)
        };
        drop(state);

        self.stats.record_acquire(source);
        trace!(slot, ?pool, ?source, "acquired descriptor pool");

        Ok((pool, slot))
    }

    /// Deposit `pool` into the slot it was drawn from.
    pub(crate) fn release_pool(&self, pool: B::Pool, slot: usize, exhausted: bool) {
        self.state.lock().slots[slot].deposit(pool, exhausted);

        self.stats.record_release(exhausted);
        trace!(slot, ?pool, exhausted, "released descriptor pool");
    }

    pub(crate) fn max_exhaustion_retries(&self) -> u32 {
        self.state.lock().config.max_exhaustion_retries
    }

    fn create_pool(&self, config: &AllocatorConfig, slot: usize) -> Result<B::Pool> {
        let flags = if slot == STATIC_SLOT {
            PoolFlags::FREE_DESCRIPTOR_SET
        } else {
            PoolFlags::empty()
        };
        let sizes = config.pool_sizes.capacities(config.base_set_count);

        let pool = self.backend.create_pool(&PoolCreateInfo {
            max_sets: config.base_set_count,
            sizes: &sizes,
            flags,
        })?;

        debug!(
            slot,
            ?pool,
            max_sets = config.base_set_count,
            flags = flags.bits(),
            "created descriptor pool"
        );
        Ok(pool)
    }
}

impl<B: PoolBackend> Drop for Shared<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let mut destroyed = 0usize;
        for pool in state.recycle_bin.drain(..) {
            self.backend.destroy_pool(pool);
            destroyed += 1;
        }
        for slot in state.slots.iter_mut() {
            for pool in slot.drain() {
                self.backend.destroy_pool(pool);
                destroyed += 1;
            }
        }

        self.stats.record_destroyed(destroyed);
        info!(destroyed, "descriptor allocator torn down");

        // Idle pools are gone by now; only pools bound to live handles leak.
        let live = self.stats.live_handles();
        if live > 0 {
            warn!(
                live,
                "descriptor allocator torn down with live handles; their pools leak"
            );
        }
        debug_assert_eq!(live, 0, "descriptor allocator dropped with live handles");
    }
}

/// Hands out [`AllocationHandle`]s backed by a rotating ring of frame slots
///
/// # Example
/// ```
/// use vke_descriptor::ResourcePoolAllocator;
/// use vke_descriptor::testing::RecordingBackend;
///
/// let mut allocator = ResourcePoolAllocator::new(RecordingBackend::new());
///
/// let mut handle = allocator.acquire()?;
/// let set = handle.allocate(&4)?;
/// drop(handle); // pool goes back to the current slot
///
/// allocator.advance_frame();
/// # let _ = set;
/// # Ok::<(), vke_descriptor::Error>(())
/// ```
pub struct ResourcePoolAllocator<B: PoolBackend> {
    shared: Arc<Shared<B>>,
}

impl<B: PoolBackend> ResourcePoolAllocator<B> {
    /// Allocator with the default configuration (3 frame slots).
    pub fn new(backend: B) -> Self {
        Self::build(backend, AllocatorConfig::default())
    }

    /// Allocator with `frame_slots` slots and otherwise default settings.
    pub fn with_frame_slots(backend: B, frame_slots: usize) -> Result<Self> {
        Self::with_config(
            backend,
            AllocatorConfig::default().with_frame_slots(frame_slots),
        )
    }

    /// Allocator with a custom configuration.
    pub fn with_config(backend: B, config: AllocatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: B, config: AllocatorConfig) -> Self {
        let slots = (0..config.frame_slots)
            .map(|_| FrameSlotStorage::default())
            .collect();

        debug!(
            frame_slots = config.frame_slots,
            base_set_count = config.base_set_count,
            "descriptor allocator created"
        );

        Self {
            shared: Arc::new(Shared {
                backend,
                state: Mutex::new(State {
                    frame_index: STATIC_SLOT,
                    slots,
                    recycle_bin: Vec::new(),
                    config,
                }),
                stats: AllocatorStats::default(),
            }),
        }
    }

    /// Get a handle bound to a pool for the current frame slot.
    ///
    /// Tries the recycle bin, then the current slot's usable bucket, and only
    /// then creates a new pool. Thread safe.
    pub fn acquire(&self) -> Result<AllocationHandle<B>> {
        let (pool, slot) = self.shared.acquire_pool()?;
        Ok(AllocationHandle::bound(
            pool,
            slot,
            Arc::downgrade(&self.shared),
        ))
    }

    /// Move to the next frame slot and recycle everything it holds.
    ///
    /// Every pool in the new current slot is reset and moved to the recycle
    /// bin. Call once per frame, after the work that used this slot
    /// `N` frames ago has completed.
    pub fn advance_frame(&mut self) {
        let mut state = self.shared.state.lock();
        let next = (state.frame_index + 1) % state.slots.len();
        state.frame_index = next;

        let State {
            slots, recycle_bin, ..
        } = &mut *state;
        let before = recycle_bin.len();
        for pool in slots[next].drain() {
            self.shared.backend.reset_pool(pool);
            recycle_bin.push(pool);
        }
        let recycled = recycle_bin.len() - before;
        drop(state);

        self.shared.stats.record_resets(recycled);
        debug!(frame = next, recycled, "advanced descriptor frame");
    }

    /// Override the size multiplier for `ty`; applies to pools created afterwards.
    pub fn configure(&mut self, ty: DescriptorType, multiplier: f32) -> Result<()> {
        validate_multiplier(ty, multiplier)?;
        self.shared.state.lock().config.pool_sizes.set(ty, multiplier);

        debug!(%ty, multiplier, "descriptor pool size multiplier updated");
        Ok(())
    }

    /// Index of the current frame slot.
    pub fn frame_index(&self) -> usize {
        self.shared.state.lock().frame_index
    }

    /// Number of frame slots in the ring.
    pub fn frame_slots(&self) -> usize {
        self.shared.state.lock().slots.len()
    }

    /// Current configuration, including multipliers set via [`configure`](Self::configure).
    pub fn config(&self) -> AllocatorConfig {
        self.shared.state.lock().config.clone()
    }

    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Where every idle pool sits right now.
    pub fn inventory(&self) -> PoolInventory<B::Pool> {
        let state = self.shared.state.lock();
        PoolInventory {
            frame_index: state.frame_index,
            recycle_bin: state.recycle_bin.clone(),
            slots: state.slots.to_vec(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl<B: PoolBackend> fmt::Debug for ResourcePoolAllocator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ResourcePoolAllocator")
            .field("frame_index", &state.frame_index)
            .field("frame_slots", &state.slots.len())
            .field("recycle_bin", &state.recycle_bin.len())
            .field("stats", &self.shared.stats.snapshot())
            .finish()
    }
}
