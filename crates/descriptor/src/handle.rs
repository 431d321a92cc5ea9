//! Move-only allocation handle
//!
//! An [`AllocationHandle`] is bound to one pool drawn from one frame slot.
//! It is returned to its allocator exactly once: on [`release`], on drop,
//! or when it is overwritten. Moving it transfers the binding; Rust moves
//! leave nothing behind to release, and `std::mem::take` leaves an inert
//! handle in place of the source.
//!
//! [`release`]: AllocationHandle::release

use std::fmt;
use std::sync::Weak;

use tracing::{error, trace, warn};

use crate::allocator::Shared;
use crate::backend::PoolBackend;
use crate::error::{Error, Result};

struct Binding<B: PoolBackend> {
    pool: B::Pool,
    slot: usize,
    /// The allocator outlives its handles by contract, so this never keeps it alive.
    owner: Weak<Shared<B>>,
}

/// Capability to allocate descriptor sets from one pool
///
/// Intended for use by a single thread or job at a time; acquire one handle
/// per worker. The handle may be sent to another thread and dropped there.
#[must_use = "dropping the handle returns its pool immediately"]
pub struct AllocationHandle<B: PoolBackend> {
    binding: Option<Binding<B>>,
}

impl<B: PoolBackend> AllocationHandle<B> {
    pub(crate) fn bound(pool: B::Pool, slot: usize, owner: Weak<Shared<B>>) -> Self {
        Self {
            binding: Some(Binding { pool, slot, owner }),
        }
    }

    /// Handle bound to nothing. Same as `Default::default()`.
    pub fn inert() -> Self {
        Self { binding: None }
    }

    pub fn is_live(&self) -> bool {
        self.binding.is_some()
    }

    /// Pool currently bound, if live
    pub fn pool(&self) -> Option<B::Pool> {
        self.binding.as_ref().map(|b| b.pool)
    }

    /// Frame slot the bound pool was drawn from, if live
    pub fn slot(&self) -> Option<usize> {
        self.binding.as_ref().map(|b| b.slot)
    }

    /// Allocate one item from the bound pool.
    ///
    /// When the pool reports exhaustion or fragmentation, it is retired into
    /// its slot's exhausted bucket, a replacement is acquired from the
    /// allocator, and the request is retried. After `max_exhaustion_retries`
    /// replacements the call fails with [`Error::RetryLimitExceeded`] and the
    /// handle stays bound to the last pool.
    ///
    /// Any other failure is returned as [`Error::Allocation`] with the
    /// binding left as is; the handle can still be released normally.
    pub fn allocate(&mut self, layout: &B::Layout) -> Result<B::Item> {
        let binding = self.binding.as_mut().ok_or(Error::InertHandle)?;
        let owner = binding.owner.upgrade().ok_or(Error::AllocatorDropped)?;

        let max_retries = owner.max_exhaustion_retries();
        let mut retries = 0u32;
        loop {
            let failure = match owner.backend().allocate(binding.pool, layout) {
                Ok(item) => return Ok(item),
                Err(failure) => failure,
            };

            if !failure.is_recoverable() {
                owner.stats.record_fatal();
                error!(
                    slot = binding.slot,
                    pool = ?binding.pool,
                    ?failure,
                    "descriptor allocation failed"
                );
                return Err(failure.into());
            }

            if retries >= max_retries {
                owner.stats.record_retry_limit();
                warn!(
                    retries,
                    pool = ?binding.pool,
                    "descriptor pools keep reporting exhaustion; giving up"
                );
                return Err(Error::retry_limit_exceeded(retries));
            }

            trace!(slot = binding.slot, pool = ?binding.pool, ?failure, "retiring exhausted pool");
            owner.release_pool(binding.pool, binding.slot, true);

            match owner.acquire_pool() {
                Ok((pool, slot)) => {
                    binding.pool = pool;
                    binding.slot = slot;
                }
                Err(err) => {
                    // The old pool is already deposited; stay inert rather than return it twice.
                    self.binding = None;
                    return Err(err);
                }
            }

            retries += 1;
            owner.stats.record_retry();
        }
    }

    /// Return the bound pool to its slot's usable bucket. No-op when inert.
    pub fn release(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };

        match binding.owner.upgrade() {
            Some(owner) => owner.release_pool(binding.pool, binding.slot, false),
            None => warn!(
                pool = ?binding.pool,
                slot = binding.slot,
                "allocator gone before handle release; pool leaked"
            ),
        }
    }
}

impl<B: PoolBackend> Default for AllocationHandle<B> {
    fn default() -> Self {
        Self::inert()
    }
}

impl<B: PoolBackend> Drop for AllocationHandle<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: PoolBackend> fmt::Debug for AllocationHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Some(binding) => f
                .debug_struct("AllocationHandle")
                .field("pool", &binding.pool)
                .field("slot", &binding.slot)
                .finish(),
            None => f.write_str("AllocationHandle(inert)"),
        }
    }
}
