//! # Size-Class Registry
//!
//! Process-scoped root state: maps each normalized entry size to its one
//! manager and routes every entry operation through a handle. Held
//! explicitly by the embedding server rather than as a global, so init and
//! teardown are visible at the call sites.

use crate::error::{PoolError, PoolResult};
use crate::free_list::EntryRef;
use crate::manager::EntryManager;
use crate::{ENTRY_ALIGN, LINK_BYTES, ROOT_SIZE};

/// Reference-counted lease on one entry manager.
///
/// Handles are plain copyable values; copying one does NOT add an
/// instance - only [`EntryPool::acquire`] does. A handle goes stale once
/// its manager is destroyed (last release or forced teardown), after which
/// every operation through it is rejected; the generation stamp is what
/// detects a recycled registry slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    /// Registry slot hosting the manager.
    slot: u32,
    /// Slot generation at acquisition time.
    generation: u32,
}

/// One registry slot. The generation advances every time a manager dies so
/// stale handles never resolve.
struct Slot {
    manager: Option<EntryManager>,
    generation: u32,
}

/// The size-class entry pool.
///
/// Single-threaded by contract: no internal locking exists, and callers
/// using the pool from multiple threads must serialize every operation
/// externally.
pub struct EntryPool {
    /// Slot array, bounded by [`ROOT_SIZE`]. Lookup is a linear scan; the
    /// number of distinct size classes stays small in practice.
    slots: Vec<Slot>,
}

impl EntryPool {
    /// Creates an empty pool. No memory is allocated until the first
    /// manager is created.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Acquires a handle on the manager for `size`-byte entries.
    ///
    /// The size is normalized first: raised to [`LINK_BYTES`] and rounded
    /// up to the [`ENTRY_ALIGN`] boundary. Callers of the same normalized
    /// size share one manager, so entries freed through one handle are
    /// reused through the others.
    ///
    /// # Errors
    ///
    /// [`PoolError::ZeroSize`] for a zero request,
    /// [`PoolError::RegistryFull`] when a new manager is needed but every
    /// slot is taken, [`PoolError::CapacityOverflow`] when normalization
    /// itself overflows.
    pub fn acquire(&mut self, size: u32) -> PoolResult<PoolHandle> {
        let size = normalize_size(size)?;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(manager) = slot.manager.as_mut() {
                if manager.entry_size() == size {
                    manager.add_instance();
                    return Ok(PoolHandle {
                        slot: index as u32,
                        generation: slot.generation,
                    });
                }
            }
        }

        // New size class: reuse the lowest free slot, growing the array
        // up to the registry bound.
        let index = match self.slots.iter().position(|slot| slot.manager.is_none()) {
            Some(index) => index,
            None if self.slots.len() < ROOT_SIZE => {
                self.slots.push(Slot {
                    manager: None,
                    generation: 0,
                });
                self.slots.len() - 1
            }
            None => {
                tracing::error!(
                    "acquire: no slot left for a new size class (capacity {ROOT_SIZE})"
                );
                return Err(PoolError::RegistryFull {
                    capacity: ROOT_SIZE,
                });
            }
        };
        self.slots[index].manager = Some(EntryManager::new(size));
        Ok(PoolHandle {
            slot: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Allocates one entry from the handle's manager.
    ///
    /// Reuses the most recently freed entry when one exists, otherwise
    /// carves a fresh slot. No assumption may be made about the bytes of
    /// the returned entry.
    ///
    /// # Errors
    ///
    /// [`PoolError::StaleHandle`] for a dead handle,
    /// [`PoolError::CapacityOverflow`] when block bookkeeping can no
    /// longer grow.
    pub fn allocate(&mut self, handle: PoolHandle) -> PoolResult<EntryRef> {
        let Some(manager) = self.manager_mut(handle) else {
            tracing::error!("allocate: stale pool handle {handle:?}");
            return Err(PoolError::StaleHandle);
        };
        manager.allocate()
    }

    /// Returns an entry to its manager's free list.
    ///
    /// Null refs and stale handles are logged and ignored. Entries must be
    /// freed through the manager that allocated them, exactly once; release
    /// builds do not verify this, debug builds detect violations through an
    /// occupancy bitmap and drop the offending free.
    pub fn free(&mut self, handle: PoolHandle, entry: EntryRef) {
        let Some(manager) = self.manager_mut(handle) else {
            tracing::error!("free: stale pool handle {handle:?}");
            return;
        };
        manager.free(entry);
    }

    /// Returns the normalized entry size behind `handle`, or 0 for a stale
    /// handle (logged).
    #[must_use]
    pub fn entry_size(&self, handle: PoolHandle) -> u32 {
        let Some(manager) = self.manager(handle) else {
            tracing::error!("entry_size: stale pool handle {handle:?}, returning 0");
            return 0;
        };
        manager.entry_size()
    }

    /// Returns the bytes of an allocated entry.
    ///
    /// `None` for stale handles or refs that do not resolve to a carved
    /// slot of this manager. Refs to freed entries still resolve: carved
    /// slots are indistinguishable from allocated ones here, so reading
    /// one returns free-list link bytes.
    #[must_use]
    pub fn entry_bytes(&self, handle: PoolHandle, entry: EntryRef) -> Option<&[u8]> {
        self.manager(handle)?.entry_bytes(entry)
    }

    /// Mutable variant of [`Self::entry_bytes`].
    ///
    /// Writing through a ref that was already freed corrupts reuse
    /// tracking silently - the entry's first bytes hold a free-list link
    /// while it sits on the list. Caller obligation, not checked here.
    pub fn entry_bytes_mut(&mut self, handle: PoolHandle, entry: EntryRef) -> Option<&mut [u8]> {
        self.manager_mut(handle)?.entry_bytes_mut(entry)
    }

    /// Releases a handle, destroying the manager when it was the last one.
    ///
    /// Destruction runs the best-effort census and logs a warning for
    /// missing entries (carved, never freed) or extra entries (free list
    /// longer than everything carved); either way destruction proceeds and
    /// the slot's generation advances so remaining refs go stale.
    ///
    /// # Errors
    ///
    /// [`PoolError::StaleHandle`] when the handle is already dead.
    pub fn release(&mut self, handle: PoolHandle) -> PoolResult<()> {
        let Some(manager) = self.manager_mut(handle) else {
            tracing::error!("release: stale pool handle {handle:?}");
            return Err(PoolError::StaleHandle);
        };
        if manager.drop_instance() > 0 {
            return Ok(());
        }

        // Last instance: best-effort accounting, then tear the manager down.
        let census = manager.census();
        let entry_size = manager.entry_size();
        if census.in_use > 0 {
            tracing::warn!(
                "release: {} entries missing for size class {entry_size}, continuing destruction",
                census.in_use
            );
        } else if census.extra > 0 {
            tracing::warn!(
                "release: {} extra entries found for size class {entry_size}, continuing destruction",
                census.extra
            );
        }
        let slot = &mut self.slots[handle.slot as usize];
        slot.manager = None;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(())
    }

    /// Forcibly destroys every manager, checking nothing.
    ///
    /// Instance counts are ignored; all outstanding handles and entry refs
    /// become stale immediately. Intended for process-exit cleanup only -
    /// calling it while other handles believe the pool live is a
    /// documented hazard, not a guarded error.
    pub fn destroy_all(&mut self) {
        for slot in &mut self.slots {
            slot.manager = None;
            slot.generation = slot.generation.wrapping_add(1);
        }
    }

    /// Returns the number of live managers.
    #[must_use]
    pub fn manager_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.manager.is_some())
            .count()
    }

    /// Checks whether no manager is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manager_count() == 0
    }

    /// Iterates over live managers, registry order.
    pub(crate) fn managers(&self) -> impl Iterator<Item = &EntryManager> + '_ {
        self.slots.iter().filter_map(|slot| slot.manager.as_ref())
    }

    fn manager(&self, handle: PoolHandle) -> Option<&EntryManager> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.manager.as_ref()
    }

    fn manager_mut(&mut self, handle: PoolHandle) -> Option<&mut EntryManager> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.manager.as_mut()
    }
}

impl Default for EntryPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Raises `size` to the link minimum and aligns it up.
fn normalize_size(size: u32) -> PoolResult<u32> {
    if size == 0 {
        tracing::error!("acquire: zero entry size is invalid");
        return Err(PoolError::ZeroSize);
    }
    size.max(LINK_BYTES)
        .checked_next_multiple_of(ENTRY_ALIGN)
        .ok_or(PoolError::CapacityOverflow { entry_size: size })
}
