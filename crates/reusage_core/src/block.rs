//! # Block Store
//!
//! Raw entry blocks for a single size class. Each block holds
//! [`BLOCK_ENTRIES`] entries of the manager's normalized size and is never
//! moved, resized, or freed individually - only the block-pointer array
//! grows, so entry refs handed to callers stay stable.

use std::ops::Range;

use crate::error::{PoolError, PoolResult};
use crate::free_list::EntryRef;
use crate::BLOCK_ENTRIES;

/// Owned memory blocks of one entry manager.
///
/// Slots in the newest block are carved top-down; `free_in_last` is the
/// carve watermark (slots below it were never handed out).
pub(crate) struct BlockStore {
    /// Normalized entry size in bytes. Immutable after creation.
    entry_size: u32,
    /// Allocated blocks, each `entry_size * BLOCK_ENTRIES` bytes.
    blocks: Vec<Box<[u8]>>,
    /// Allocated capacity of the block array, grown as `old * 4 + 3`.
    block_capacity: u32,
    /// Never-carved slots remaining in the newest block.
    free_in_last: u32,
}

impl BlockStore {
    /// Creates an empty store. No memory is allocated until the first carve.
    pub(crate) const fn new(entry_size: u32) -> Self {
        Self {
            entry_size,
            blocks: Vec::new(),
            block_capacity: 0,
            free_in_last: 0,
        }
    }

    /// Returns the normalized entry size in bytes.
    pub(crate) const fn entry_size(&self) -> u32 {
        self.entry_size
    }

    /// Returns the number of allocated blocks.
    pub(crate) fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    /// Returns the allocated capacity of the block array.
    pub(crate) const fn capacity(&self) -> u32 {
        self.block_capacity
    }

    /// Returns the never-carved slot count in the newest block.
    pub(crate) const fn unused_tail(&self) -> u32 {
        self.free_in_last
    }

    /// Total entries ever carved from blocks, saturating at `u32::MAX`.
    ///
    /// Every carved entry is either held by a caller or sitting on the
    /// free list; this count is the baseline for both.
    pub(crate) fn carved_count(&self) -> u32 {
        let Some(full_blocks) = self.blocks.len().checked_sub(1) else {
            return 0;
        };
        let carved = full_blocks as u64 * u64::from(BLOCK_ENTRIES)
            + u64::from(BLOCK_ENTRIES - self.free_in_last);
        u32::try_from(carved).unwrap_or(u32::MAX)
    }

    /// Hands out the next never-used slot, allocating a new block when the
    /// current one is exhausted.
    ///
    /// O(1) amortized; existing blocks are never touched.
    pub(crate) fn carve(&mut self) -> PoolResult<EntryRef> {
        if self.free_in_last == 0 {
            self.grow()?;
        }
        self.free_in_last -= 1;
        let block = (self.blocks.len() - 1) as u32;
        Ok(EntryRef::new(block, self.free_in_last))
    }

    /// Allocates one more block, expanding the block array first if it is
    /// at capacity.
    ///
    /// Capacity follows `new = old * 4 + 3` (0 -> 3 -> 15 -> 63 ...), which
    /// amortizes array reallocation while keeping the array small.
    fn grow(&mut self) -> PoolResult<()> {
        if self.block_count() == self.block_capacity {
            let grown = self
                .block_capacity
                .checked_mul(4)
                .and_then(|capacity| capacity.checked_add(3))
                .ok_or(PoolError::CapacityOverflow {
                    entry_size: self.entry_size,
                })?;
            self.blocks
                .reserve_exact((grown - self.block_capacity) as usize);
            self.block_capacity = grown;
        }
        let bytes = self.entry_size as usize * BLOCK_ENTRIES as usize;
        self.blocks.push(vec![0_u8; bytes].into_boxed_slice());
        self.free_in_last = BLOCK_ENTRIES;
        Ok(())
    }

    /// Returns the bytes of a carved entry, or `None` when the ref does not
    /// resolve to a slot this store handed out.
    pub(crate) fn entry_bytes(&self, entry: EntryRef) -> Option<&[u8]> {
        let range = self.entry_range(entry)?;
        Some(&self.blocks[entry.block() as usize][range])
    }

    /// Mutable variant of [`Self::entry_bytes`].
    pub(crate) fn entry_bytes_mut(&mut self, entry: EntryRef) -> Option<&mut [u8]> {
        let range = self.entry_range(entry)?;
        Some(&mut self.blocks[entry.block() as usize][range])
    }

    /// Byte range of a carved entry within its block.
    fn entry_range(&self, entry: EntryRef) -> Option<Range<usize>> {
        if entry.is_null() {
            return None;
        }
        let block = entry.block() as usize;
        let slot = entry.slot();
        if block >= self.blocks.len() || slot >= BLOCK_ENTRIES {
            return None;
        }
        // Slots below the watermark of the newest block were never carved.
        if block == self.blocks.len() - 1 && slot < self.free_in_last {
            return None;
        }
        let start = slot as usize * self.entry_size as usize;
        Some(start..start + self.entry_size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carve_is_top_down_within_block() {
        let mut store = BlockStore::new(16);
        let first = store.carve().unwrap();
        let second = store.carve().unwrap();

        assert_eq!(first, EntryRef::new(0, BLOCK_ENTRIES - 1));
        assert_eq!(second, EntryRef::new(0, BLOCK_ENTRIES - 2));
        assert_eq!(store.block_count(), 1);
        assert_eq!(store.carved_count(), 2);
    }

    #[test]
    fn test_block_allocated_only_when_tail_is_exhausted() {
        let mut store = BlockStore::new(8);
        for _ in 0..BLOCK_ENTRIES {
            store.carve().unwrap();
        }
        assert_eq!(store.block_count(), 1);
        assert_eq!(store.unused_tail(), 0);

        store.carve().unwrap();
        assert_eq!(store.block_count(), 2);
        assert_eq!(store.unused_tail(), BLOCK_ENTRIES - 1);
    }

    #[test]
    fn test_capacity_growth_policy() {
        let mut store = BlockStore::new(8);
        assert_eq!(store.capacity(), 0);

        store.carve().unwrap();
        assert_eq!(store.capacity(), 3);

        // Fill three blocks, then one more carve must expand to 15.
        for _ in 1..(u64::from(BLOCK_ENTRIES) * 3) {
            store.carve().unwrap();
        }
        assert_eq!(store.block_count(), 3);
        assert_eq!(store.capacity(), 3);

        store.carve().unwrap();
        assert_eq!(store.block_count(), 4);
        assert_eq!(store.capacity(), 15);
    }

    #[test]
    fn test_entry_bytes_bounds() {
        let mut store = BlockStore::new(24);
        let entry = store.carve().unwrap();

        assert_eq!(store.entry_bytes(entry).unwrap().len(), 24);
        assert!(store.entry_bytes(EntryRef::NULL).is_none());
        assert!(store.entry_bytes(EntryRef::new(1, 0)).is_none());
        // Never-carved slot below the watermark.
        assert!(store.entry_bytes(EntryRef::new(0, 0)).is_none());
    }

    #[test]
    fn test_entry_bytes_are_stable_across_growth() {
        let mut store = BlockStore::new(8);
        let entry = store.carve().unwrap();
        store.entry_bytes_mut(entry).unwrap().fill(0x5A);

        for _ in 1..=u64::from(BLOCK_ENTRIES) {
            store.carve().unwrap();
        }
        assert_eq!(store.entry_bytes(entry).unwrap(), &[0x5A; 8]);
    }
}
