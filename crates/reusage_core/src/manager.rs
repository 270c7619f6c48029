//! # Entry Manager
//!
//! One manager per size class: owns the block store and the free list,
//! counts live handles, and runs the best-effort accounting used by
//! destruction warnings and reporting.

use crate::block::BlockStore;
use crate::error::PoolResult;
use crate::free_list::{EntryRef, FreeList};

/// Population estimate for one manager.
///
/// Derived from free-list length versus the carved-entry count. This can
/// detect consistency violations (entries missing, free list longer than
/// everything ever carved) but cannot identify which specific entry leaked
/// or was freed twice.
pub(crate) struct Census {
    /// Entries carved out and not on the free list.
    pub(crate) in_use: u32,
    /// Entries waiting on the free list, capped at the carved count.
    pub(crate) reusable: u32,
    /// Free-list overrun beyond the carved count; nonzero means a logic
    /// error such as a double free.
    pub(crate) extra: u32,
}

/// Manages every entry of a single normalized size.
pub(crate) struct EntryManager {
    /// Owned blocks and carve state.
    store: BlockStore,
    /// Reusable entries, most recently freed first.
    free: FreeList,
    /// Live handles referencing this manager.
    instances: u32,
    #[cfg(debug_assertions)]
    occupancy: Occupancy,
}

impl EntryManager {
    /// Creates a manager with a single instance and no allocated blocks.
    pub(crate) const fn new(entry_size: u32) -> Self {
        Self {
            store: BlockStore::new(entry_size),
            free: FreeList::new(),
            instances: 1,
            #[cfg(debug_assertions)]
            occupancy: Occupancy::new(),
        }
    }

    /// Returns the normalized entry size in bytes. Pure query.
    pub(crate) const fn entry_size(&self) -> u32 {
        self.store.entry_size()
    }

    /// Returns the live handle count.
    pub(crate) const fn instances(&self) -> u32 {
        self.instances
    }

    /// Records one more live handle.
    pub(crate) fn add_instance(&mut self) {
        self.instances += 1;
    }

    /// Records a released handle and returns how many remain.
    pub(crate) fn drop_instance(&mut self) -> u32 {
        self.instances -= 1;
        self.instances
    }

    /// Returns the number of allocated blocks.
    pub(crate) fn block_count(&self) -> u32 {
        self.store.block_count()
    }

    /// Returns the allocated capacity of the block array.
    pub(crate) const fn block_capacity(&self) -> u32 {
        self.store.capacity()
    }

    /// Returns the never-carved slot count in the newest block.
    pub(crate) const fn unused_tail(&self) -> u32 {
        self.store.unused_tail()
    }

    /// Allocates one entry: reuse from the free list first, carve a fresh
    /// slot otherwise.
    ///
    /// Reused entries carry whatever bytes their previous occupant left;
    /// callers must not rely on zero-initialization.
    pub(crate) fn allocate(&mut self) -> PoolResult<EntryRef> {
        let entry = match self.free.pop(&self.store) {
            Some(entry) => entry,
            None => self.store.carve()?,
        };
        #[cfg(debug_assertions)]
        self.occupancy.mark_allocated(entry);
        Ok(entry)
    }

    /// Returns an entry to the free list.
    ///
    /// A null ref is logged and ignored. Release builds do not check that
    /// the entry is currently live - freeing twice or freeing an entry of
    /// another manager is a caller contract violation. Debug builds catch
    /// both through the occupancy bitmap.
    pub(crate) fn free(&mut self, entry: EntryRef) {
        if entry.is_null() {
            tracing::error!("free: null entry ref, nothing to free");
            return;
        }
        #[cfg(debug_assertions)]
        if !self.occupancy.mark_freed(entry) {
            tracing::error!(
                "free: entry {entry:?} is not live in this manager (double free or foreign ref), ignoring"
            );
            return;
        }
        if !self.free.push(&mut self.store, entry) {
            tracing::error!("free: entry {entry:?} does not resolve to a carved slot, ignoring");
        }
    }

    /// Returns the bytes of a carved entry.
    pub(crate) fn entry_bytes(&self, entry: EntryRef) -> Option<&[u8]> {
        self.store.entry_bytes(entry)
    }

    /// Mutable variant of [`Self::entry_bytes`].
    pub(crate) fn entry_bytes_mut(&mut self, entry: EntryRef) -> Option<&mut [u8]> {
        self.store.entry_bytes_mut(entry)
    }

    /// Walks the free list against the carved count, read-only.
    ///
    /// Consumes free-list length against everything ever carved; what the
    /// list does not cover is presumed in use, what it covers beyond the
    /// carved count is an overrun. Link bytes are only read, never written.
    pub(crate) fn census(&self) -> Census {
        let carved = self.store.carved_count();
        let mut remaining = carved;
        let mut cursor = self.free.head();
        while !cursor.is_null() && remaining > 0 {
            remaining -= 1;
            cursor = FreeList::next(&self.store, cursor);
        }
        let reusable = carved - remaining;
        let mut extra = 0_u32;
        while !cursor.is_null() && extra != u32::MAX {
            extra += 1;
            cursor = FreeList::next(&self.store, cursor);
        }
        Census {
            in_use: remaining,
            reusable,
            extra,
        }
    }
}

/// Debug-build occupancy bitmap, one bit per carved slot.
///
/// Set while the entry is held by a caller. Catches the double frees and
/// foreign refs that the release fast path does not check for.
#[cfg(debug_assertions)]
struct Occupancy {
    bits: Vec<u64>,
}

#[cfg(debug_assertions)]
impl Occupancy {
    const fn new() -> Self {
        Self { bits: Vec::new() }
    }

    fn bit_index(entry: EntryRef) -> usize {
        entry.block() as usize * crate::BLOCK_ENTRIES as usize + entry.slot() as usize
    }

    fn mark_allocated(&mut self, entry: EntryRef) {
        let index = Self::bit_index(entry);
        let word = index / 64;
        if self.bits.len() <= word {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1 << (index % 64);
    }

    /// Clears the live bit; `false` when the entry was not live.
    fn mark_freed(&mut self, entry: EntryRef) -> bool {
        let index = Self::bit_index(entry);
        let mask = 1_u64 << (index % 64);
        let Some(word) = self.bits.get_mut(index / 64) else {
            return false;
        };
        if *word & mask == 0 {
            return false;
        }
        *word &= !mask;
        true
    }
}
