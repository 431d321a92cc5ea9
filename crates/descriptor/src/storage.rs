//! Per-frame-slot pool buckets
//!
//! Order inside a bucket carries no meaning; both are used as stacks.

/// Pools owned by one frame slot
#[derive(Debug, Clone)]
pub struct FrameSlotStorage<P> {
    /// Pools returned with spare capacity
    usable: Vec<P>,
    /// Pools that reported exhaustion, waiting for this slot's next reset
    exhausted: Vec<P>,
}

impl<P> Default for FrameSlotStorage<P> {
    fn default() -> Self {
        Self {
            usable: Vec::new(),
            exhausted: Vec::new(),
        }
    }
}

impl<P: Copy> FrameSlotStorage<P> {
    pub(crate) fn deposit(&mut self, pool: P, exhausted: bool) {
        if exhausted {
            self.exhausted.push(pool);
        } else {
            self.usable.push(pool);
        }
    }

    pub(crate) fn pop_usable(&mut self) -> Option<P> {
        self.usable.pop()
    }

    /// Empty both buckets, exhausted pools first.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = P> + '_ {
        self.exhausted.drain(..).chain(self.usable.drain(..))
    }

    pub fn usable(&self) -> &[P] {
        &self.usable
    }

    pub fn exhausted(&self) -> &[P] {
        &self.exhausted
    }

    pub fn len(&self) -> usize {
        self.usable.len() + self.exhausted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usable.is_empty() && self.exhausted.is_empty()
    }
}

/// Point-in-time copy of where every idle pool sits
///
/// Pools bound to live handles appear nowhere in it.
#[derive(Debug, Clone)]
pub struct PoolInventory<P> {
    pub frame_index: usize,
    pub recycle_bin: Vec<P>,
    pub slots: Vec<FrameSlotStorage<P>>,
}

impl<P: Copy + PartialEq> PoolInventory<P> {
    /// Every idle pool, recycle bin first, then slot by slot.
    pub fn pools(&self) -> impl Iterator<Item = P> + '_ {
        self.recycle_bin.iter().copied().chain(
            self.slots
                .iter()
                .flat_map(|slot| slot.exhausted.iter().chain(slot.usable.iter()).copied()),
        )
    }

    /// Number of places `pool` currently sits in. Anything above 1 is a bug.
    pub fn occurrences(&self, pool: P) -> usize {
        self.pools().filter(|p| *p == pool).count()
    }

    pub fn contains(&self, pool: P) -> bool {
        self.occurrences(pool) > 0
    }

    pub fn total(&self) -> usize {
        self.recycle_bin.len() + self.slots.iter().map(FrameSlotStorage::len).sum::<usize>()
    }
}
