//! Allocator configuration
//!
//! [`PoolSizeConfig`] decides how large each freshly created pool is per
//! descriptor type; [`AllocatorConfig`] bundles it with the ring size, the
//! base set count and the exhaustion retry cap.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of frame slots in the ring
pub const DEFAULT_FRAME_SLOTS: usize = 3;

/// Default `max_sets` of a fresh pool; per-type capacities scale from it
pub const DEFAULT_BASE_SET_COUNT: u32 = 2000;

/// Default number of replacement pools tried by one `allocate` call
pub const DEFAULT_MAX_EXHAUSTION_RETRIES: u32 = 8;

/// Descriptor category a pool reserves capacity for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
    InputAttachment,
    InlineUniformBlock,
    AccelerationStructure,
}

impl DescriptorType {
    /// Check if this is a buffer type.
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            Self::UniformBuffer
                | Self::StorageBuffer
                | Self::UniformBufferDynamic
                | Self::StorageBufferDynamic
                | Self::UniformTexelBuffer
                | Self::StorageTexelBuffer
        )
    }

    /// Check if this is a dynamic-offset type.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::UniformBufferDynamic | Self::StorageBufferDynamic)
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sampler => "sampler",
            Self::CombinedImageSampler => "combined-image-sampler",
            Self::SampledImage => "sampled-image",
            Self::StorageImage => "storage-image",
            Self::UniformTexelBuffer => "uniform-texel-buffer",
            Self::StorageTexelBuffer => "storage-texel-buffer",
            Self::UniformBuffer => "uniform-buffer",
            Self::StorageBuffer => "storage-buffer",
            Self::UniformBufferDynamic => "uniform-buffer-dynamic",
            Self::StorageBufferDynamic => "storage-buffer-dynamic",
            Self::InputAttachment => "input-attachment",
            Self::InlineUniformBlock => "inline-uniform-block",
            Self::AccelerationStructure => "acceleration-structure",
        };
        f.write_str(name)
    }
}

/// One `(type, multiplier)` row of the size table
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolSize {
    pub ty: DescriptorType,
    pub multiplier: f32,
}

impl PoolSize {
    pub const fn new(ty: DescriptorType, multiplier: f32) -> Self {
        Self { ty, multiplier }
    }

    /// Descriptor count this row reserves in a pool of `base` sets
    #[must_use]
    pub fn capacity(&self, base: u32) -> u32 {
        (self.multiplier * base as f32).round() as u32
    }
}

/// Ordered size table, at most one row per descriptor type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PoolSizeConfig {
    sizes: Vec<PoolSize>,
}

impl Default for PoolSizeConfig {
    fn default() -> Self {
        use DescriptorType as T;

        Self {
            sizes: vec![
                PoolSize::new(T::Sampler, 1.0),
                PoolSize::new(T::CombinedImageSampler, 4.0),
                PoolSize::new(T::SampledImage, 4.0),
                PoolSize::new(T::StorageImage, 1.0),
                PoolSize::new(T::UniformTexelBuffer, 1.0),
                PoolSize::new(T::StorageTexelBuffer, 1.0),
                PoolSize::new(T::UniformBuffer, 2.0),
                PoolSize::new(T::StorageBuffer, 2.0),
                PoolSize::new(T::UniformBufferDynamic, 1.0),
                PoolSize::new(T::StorageBufferDynamic, 1.0),
                PoolSize::new(T::InputAttachment, 1.0),
            ],
        }
    }
}

impl PoolSizeConfig {
    /// Empty table; pools created from it only carry `max_sets`
    #[must_use]
    pub fn empty() -> Self {
        Self { sizes: Vec::new() }
    }

    /// Upsert the multiplier for `ty`. Unknown types are appended.
    pub fn set(&mut self, ty: DescriptorType, multiplier: f32) {
        match self.sizes.iter_mut().find(|s| s.ty == ty) {
            Some(size) => size.multiplier = multiplier,
            None => self.sizes.push(PoolSize::new(ty, multiplier)),
        }
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, ty: DescriptorType, multiplier: f32) -> Self {
        self.set(ty, multiplier);
        self
    }

    pub fn get(&self, ty: DescriptorType) -> Option<f32> {
        self.sizes.iter().find(|s| s.ty == ty).map(|s| s.multiplier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolSize> {
        self.sizes.iter()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Per-type descriptor counts for a pool of `base` sets, in table order
    pub fn capacities(&self, base: u32) -> Vec<(DescriptorType, u32)> {
        self.sizes
            .iter()
            .map(|s| (s.ty, s.capacity(base)))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for size in &self.sizes {
            validate_multiplier(size.ty, size.multiplier)?;
        }
        // Deserialized tables bypass `set`, so duplicates are possible there.
        for (i, size) in self.sizes.iter().enumerate() {
            if self.sizes[..i].iter().any(|s| s.ty == size.ty) {
                return Err(Error::invalid_config(format!(
                    "duplicate pool size entry for {}",
                    size.ty
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PoolSizeConfig {
    type Item = &'a PoolSize;
    type IntoIter = std::slice::Iter<'a, PoolSize>;

    fn into_iter(self) -> Self::IntoIter {
        self.sizes.iter()
    }
}

pub(crate) fn validate_multiplier(ty: DescriptorType, multiplier: f32) -> Result<()> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(Error::invalid_config(format!(
            "multiplier for {ty} must be finite and non-negative, got {multiplier}"
        )));
    }
    Ok(())
}

/// Configuration for [`ResourcePoolAllocator`](crate::ResourcePoolAllocator)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AllocatorConfig {
    /// Number of frame slots in the ring. Slot 0 is the static slot.
    pub frame_slots: usize,
    /// `max_sets` of every new pool
    pub base_set_count: u32,
    /// Replacement pools a single `allocate` may go through before giving up
    pub max_exhaustion_retries: u32,
    pub pool_sizes: PoolSizeConfig,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            frame_slots: DEFAULT_FRAME_SLOTS,
            base_set_count: DEFAULT_BASE_SET_COUNT,
            max_exhaustion_retries: DEFAULT_MAX_EXHAUSTION_RETRIES,
            pool_sizes: PoolSizeConfig::default(),
        }
    }
}

impl AllocatorConfig {
    #[must_use]
    pub fn with_frame_slots(mut self, frame_slots: usize) -> Self {
        self.frame_slots = frame_slots;
        self
    }

    #[must_use]
    pub fn with_base_set_count(mut self, base_set_count: u32) -> Self {
        self.base_set_count = base_set_count;
        self
    }

    #[must_use]
    pub fn with_max_exhaustion_retries(mut self, retries: u32) -> Self {
        self.max_exhaustion_retries = retries;
        self
    }

    #[must_use]
    pub fn with_pool_sizes(mut self, pool_sizes: PoolSizeConfig) -> Self {
        self.pool_sizes = pool_sizes;
        self
    }

    /// Validate configuration at runtime
    pub fn validate(&self) -> Result<()> {
        if self.frame_slots == 0 {
            return Err(Error::invalid_config("frame_slots must be at least 1"));
        }
        if self.base_set_count == 0 {
            return Err(Error::invalid_config("base_set_count must be positive"));
        }
        self.pool_sizes.validate()
    }
}
