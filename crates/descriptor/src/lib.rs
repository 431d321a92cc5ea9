//! # vke-descriptor
//!
//! Frame-pipelined pooling allocator for descriptor sets.
//!
//! Descriptor pools have a fixed capacity and can only be emptied as a
//! whole. This crate hides both limits behind lightweight handles:
//! - [`ResourcePoolAllocator`] keeps a ring of frame slots, each holding the
//!   pools used during that frame, plus a recycle bin of reset pools
//! - [`AllocationHandle`] is bound to one pool and transparently swaps it for
//!   a fresh one when the pool runs out of space
//! - [`ResourcePoolAllocator::advance_frame`] resets a slot's pools only when
//!   the ring comes back around to it, so in-flight frames never see their
//!   descriptor sets invalidated
//!
//! ## Quick Start
//!
//! ```rust
//! use vke_descriptor::prelude::*;
//! use vke_descriptor::testing::RecordingBackend;
//!
//! let mut allocator = ResourcePoolAllocator::with_frame_slots(RecordingBackend::new(), 2)?;
//! allocator.configure(DescriptorType::StorageBuffer, 4.0)?;
//!
//! for _frame in 0..4 {
//!     let mut handle = allocator.acquire()?;
//!     let _set = handle.allocate(&2)?;
//!     // handle returns its pool when dropped
//!     drop(handle);
//!
//!     allocator.advance_frame();
//! }
//! # Ok::<(), vke_descriptor::Error>(())
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configuration and stats
//! - `testing`: [`testing::RecordingBackend`], an in-memory pool primitive
//!
//! ## Threading
//!
//! `acquire` and handle release are serialized by one internal lock and may
//! run from any thread. `advance_frame` and `configure` take `&mut self`:
//! call them from the thread that owns the allocator, between frames.

pub mod allocator;
pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod stats;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

pub use allocator::{ResourcePoolAllocator, STATIC_SLOT};
pub use backend::{AllocFailure, PoolBackend, PoolCreateInfo, PoolFlags};
pub use config::{AllocatorConfig, DescriptorType, PoolSize, PoolSizeConfig};
pub use error::{Error, Result};
pub use handle::AllocationHandle;
pub use stats::StatsSnapshot;
pub use storage::{FrameSlotStorage, PoolInventory};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::allocator::ResourcePoolAllocator;
    pub use crate::backend::{AllocFailure, PoolBackend, PoolCreateInfo, PoolFlags};
    pub use crate::config::{AllocatorConfig, DescriptorType, PoolSizeConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handle::AllocationHandle;
}
