//! Fixed-capacity slot pool.
//!
//! The pool owns the index range `0..capacity` of the engine and partitions
//! it into free and live slots. Free slots are handed out lowest index first.

use std::collections::BTreeSet;

use densim_engine::SlotIndex;

use crate::error::{SessionError, SessionResult};

/// Partition of the engine's slot range into free and live indices.
#[derive(Debug, Clone)]
pub struct SlotPool {
    capacity: usize,
    free: BTreeSet<SlotIndex>,
    live: BTreeSet<SlotIndex>,
}

impl SlotPool {
    /// Create a pool with every slot in `0..capacity` free.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: (0..capacity).map(SlotIndex).collect(),
            live: BTreeSet::new(),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots.
    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// Number of live slots.
    pub fn num_live(&self) -> usize {
        self.live.len()
    }

    /// Whether `slot` is currently handed out.
    pub fn is_live(&self, slot: SlotIndex) -> bool {
        self.live.contains(&slot)
    }

    /// Whether `slot` is available.
    pub fn is_free(&self, slot: SlotIndex) -> bool {
        self.free.contains(&slot)
    }

    /// Iterate over the live slots in index order.
    pub fn live(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.live.iter().copied()
    }

    /// The slot [`acquire`](Self::acquire) would hand out next.
    pub fn lowest_free(&self) -> Option<SlotIndex> {
        self.free.first().copied()
    }

    /// Take a free slot and mark it live.
    pub fn acquire(&mut self) -> SessionResult<SlotIndex> {
        let slot = self.lowest_free().ok_or(SessionError::CapacityExhausted {
            capacity: self.capacity,
        })?;
        self.take(slot)?;
        Ok(slot)
    }

    /// Move a specific free slot to the live set.
    pub fn take(&mut self, slot: SlotIndex) -> SessionResult<()> {
        if !self.free.remove(&slot) {
            return Err(SessionError::SlotUnavailable(slot));
        }
        self.live.insert(slot);
        Ok(())
    }

    /// Return a live slot to the free set.
    ///
    /// Releasing a slot that is not live is a caller bug; it leaves the pool
    /// untouched.
    pub fn release(&mut self, slot: SlotIndex) {
        let was_live = self.live.remove(&slot);
        debug_assert!(was_live, "released slot {slot} that was not live");
        if was_live {
            self.free.insert(slot);
        }
    }

    /// Whether free and live are disjoint and together cover `0..capacity`.
    pub fn check_partition(&self) -> bool {
        self.free.len() + self.live.len() == self.capacity
            && self.free.is_disjoint(&self.live)
            && self
                .free
                .iter()
                .chain(self.live.iter())
                .all(|s| s.0 < self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_is_all_free() {
        let pool = SlotPool::new(4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.num_free(), 4);
        assert_eq!(pool.num_live(), 0);
        assert!(pool.check_partition());
    }

    #[test]
    fn test_acquire_release() {
        let mut pool = SlotPool::new(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert!(pool.is_live(a) && pool.is_live(b));
        assert!(pool.check_partition());

        pool.release(a);
        assert!(pool.is_free(a));
        assert!(!pool.is_live(a));
        assert_eq!(pool.num_live(), 1);
        assert!(pool.check_partition());
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = SlotPool::new(1);
        pool.acquire().unwrap();
        assert!(matches!(
            pool.acquire(),
            Err(SessionError::CapacityExhausted { capacity: 1 })
        ));
    }

    #[test]
    fn test_take_named_slot() {
        let mut pool = SlotPool::new(3);
        pool.take(SlotIndex(2)).unwrap();
        assert!(pool.is_live(SlotIndex(2)));
        assert_eq!(pool.lowest_free(), Some(SlotIndex(0)));
        assert!(pool.check_partition());

        assert!(matches!(
            pool.take(SlotIndex(2)),
            Err(SessionError::SlotUnavailable(SlotIndex(2)))
        ));
        assert!(matches!(
            pool.take(SlotIndex(3)),
            Err(SessionError::SlotUnavailable(SlotIndex(3)))
        ));
        assert_eq!(pool.num_live(), 1);
        assert!(pool.check_partition());
    }

    #[test]
    fn test_released_slot_is_reused() {
        let mut pool = SlotPool::new(1);
        let slot = pool.acquire().unwrap();
        pool.release(slot);
        assert_eq!(pool.acquire().unwrap(), slot);
    }
}
