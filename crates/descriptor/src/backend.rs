//! The pool primitive the allocator drives
//!
//! [`PoolBackend`] is the seam to the graphics API. The allocator only ever
//! creates, resets and destroys whole pools and asks a pool for one item at
//! a time; everything else (device ownership, layouts, the items themselves)
//! stays on the backend's side.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use bitflags::bitflags;

use crate::config::DescriptorType;
use crate::error::{Error, Result};

bitflags! {
    /// Pool creation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PoolFlags: u32 {
        /// Items may be freed individually, not only by resetting the whole pool.
        const FREE_DESCRIPTOR_SET = 1 << 0;
    }
}

/// Everything a backend needs to create one pool
#[derive(Debug, Clone, Copy)]
pub struct PoolCreateInfo<'a> {
    /// Maximum number of items (descriptor sets) the pool can hand out
    pub max_sets: u32,
    /// Descriptor count reserved per type
    pub sizes: &'a [(DescriptorType, u32)],
    pub flags: PoolFlags,
}

/// Why a single item allocation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocFailure {
    /// The pool has no spare capacity left.
    OutOfPoolMemory,
    /// The pool has capacity, but too fragmented to satisfy the request.
    FragmentedPool,
    /// Anything else. Never retried.
    Device { code: i32, message: String },
}

impl AllocFailure {
    /// Exhaustion and fragmentation are fixed by switching to another pool.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfPoolMemory | Self::FragmentedPool)
    }

    pub fn device(code: i32, message: impl Into<String>) -> Self {
        Self::Device {
            code,
            message: message.into(),
        }
    }
}

impl From<AllocFailure> for Error {
    fn from(failure: AllocFailure) -> Self {
        match failure {
            AllocFailure::OutOfPoolMemory => Error::allocation(0, "descriptor pool out of memory"),
            AllocFailure::FragmentedPool => Error::allocation(0, "descriptor pool fragmented"),
            AllocFailure::Device { code, message } => Error::allocation(code, message),
        }
    }
}

/// External fixed-capacity pool primitive
///
/// Implementations wrap a device handle and forward to the graphics API.
/// All methods may be called from any thread; the allocator never calls
/// `reset_pool` or `destroy_pool` on a pool bound to a live handle.
pub trait PoolBackend: Send + Sync + 'static {
    /// Opaque pool identity
    type Pool: Copy + Eq + Hash + Debug + Send + Sync + 'static;
    /// Describes the item to allocate (a descriptor set layout)
    type Layout;
    /// An allocated item (a descriptor set)
    type Item;

    /// Create a new pool. Failure here is fatal and is not retried.
    fn create_pool(&self, info: &PoolCreateInfo<'_>) -> Result<Self::Pool>;

    /// Return the pool to empty, invalidating every item allocated from it.
    fn reset_pool(&self, pool: Self::Pool);

    /// Release the pool's host resources.
    fn destroy_pool(&self, pool: Self::Pool);

    /// Carve one item out of `pool`.
    fn allocate(
        &self,
        pool: Self::Pool,
        layout: &Self::Layout,
    ) -> std::result::Result<Self::Item, AllocFailure>;
}

impl<T: PoolBackend> PoolBackend for Arc<T> {
    type Pool = T::Pool;
    type Layout = T::Layout;
    type Item = T::Item;

    fn create_pool(&self, info: &PoolCreateInfo<'_>) -> Result<Self::Pool> {
        (**self).create_pool(info)
    }

    fn reset_pool(&self, pool: Self::Pool) {
        (**self).reset_pool(pool);
    }

    fn destroy_pool(&self, pool: Self::Pool) {
        (**self).destroy_pool(pool);
    }

    fn allocate(
        &self,
        pool: Self::Pool,
        layout: &Self::Layout,
    ) -> std::result::Result<Self::Item, AllocFailure> {
        (**self).allocate(pool, layout)
    }
}
