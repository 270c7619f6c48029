//! # Intrusive Free List
//!
//! Freed entries are chained through their own memory: the first
//! [`LINK_BYTES`](crate::LINK_BYTES) bytes of a freed slot hold the packed
//! ref of the next free entry. Tracking reuse therefore costs no side
//! allocations, which is why normalized entry sizes are never smaller than
//! one link.

use crate::block::BlockStore;
use crate::LINK_BYTES;

/// Reference to a single entry slot.
///
/// The ref is split into two parts:
/// - Upper 32 bits: index of the owning block
/// - Lower 32 bits: slot index within that block
///
/// Refs stay valid until the owning manager is destroyed; blocks are never
/// moved or reallocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntryRef(u64);

impl EntryRef {
    /// Null/invalid entry reference.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an entry reference from block and slot indices.
    #[inline]
    #[must_use]
    pub(crate) const fn new(block: u32, slot: u32) -> Self {
        Self(((block as u64) << 32) | (slot as u64))
    }

    /// Returns the block index portion.
    #[inline]
    #[must_use]
    pub const fn block(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the slot index portion.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.0 as u32
    }

    /// Checks if this entry reference is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw representation, as stored in a freed entry's link bytes.
    const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds a reference from stored link bytes.
    const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for EntryRef {
    fn default() -> Self {
        Self::NULL
    }
}

/// LIFO stack of freed entries, overlaid on the freed memory itself.
///
/// The list head lives here; every other link lives inside a freed entry.
/// The most recently freed entry is always returned first.
pub(crate) struct FreeList {
    /// Most recently freed entry, or null when nothing is reusable.
    head: EntryRef,
}

impl FreeList {
    /// Creates an empty free list.
    pub(crate) const fn new() -> Self {
        Self {
            head: EntryRef::NULL,
        }
    }

    /// Returns the most recently freed entry without removing it.
    pub(crate) const fn head(&self) -> EntryRef {
        self.head
    }

    /// Pushes a freed entry, writing the previous head into its link bytes.
    ///
    /// Returns `false` when the ref does not resolve to a carved slot in
    /// `store`; the list is left untouched in that case.
    pub(crate) fn push(&mut self, store: &mut BlockStore, entry: EntryRef) -> bool {
        let Some(bytes) = store.entry_bytes_mut(entry) else {
            return false;
        };
        bytes[..LINK_BYTES as usize].copy_from_slice(&self.head.to_bits().to_le_bytes());
        self.head = entry;
        true
    }

    /// Pops the most recently freed entry, O(1).
    pub(crate) fn pop(&mut self, store: &BlockStore) -> Option<EntryRef> {
        if self.head.is_null() {
            return None;
        }
        let entry = self.head;
        self.head = Self::next(store, entry);
        Some(entry)
    }

    /// Reads the link stored in a freed entry without altering it.
    ///
    /// Used by the read-only accounting traversals.
    pub(crate) fn next(store: &BlockStore, entry: EntryRef) -> EntryRef {
        let Some(bytes) = store.entry_bytes(entry) else {
            return EntryRef::NULL;
        };
        let mut raw = [0_u8; LINK_BYTES as usize];
        raw.copy_from_slice(&bytes[..LINK_BYTES as usize]);
        EntryRef::from_bits(u64::from_le_bytes(raw))
    }
}
