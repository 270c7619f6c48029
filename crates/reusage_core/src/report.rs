//! # Pool Reporting
//!
//! Read-only diagnostic snapshots of the registry and every live manager.
//! Counting walks the same free-list links as destruction accounting but
//! never writes them.

use std::fmt;

use crate::registry::EntryPool;
use crate::{BLOCK_ENTRIES, ROOT_SIZE};

/// Point-in-time usage snapshot of one entry manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerReport {
    /// Live handle count.
    pub instances: u32,
    /// Normalized entry size in bytes.
    pub entry_size: u32,
    /// Allocated capacity of the block array.
    pub block_capacity: u32,
    /// Blocks currently allocated.
    pub block_count: u32,
    /// Entries carved out and not on the free list.
    pub in_use: u32,
    /// Never-carved entries at the tail of the newest block.
    pub unused_tail: u32,
    /// Entries waiting on the free list.
    pub reusable: u32,
    /// Free-list overrun beyond the carved count; nonzero indicates a
    /// logic error such as a double free.
    pub extra: u32,
}

/// Snapshot of the whole registry, one section per live manager.
#[derive(Clone, Debug)]
pub struct PoolReport {
    /// Registry slot capacity.
    pub capacity: usize,
    /// Entries-per-block constant in effect.
    pub block_entries: u32,
    /// Per-manager usage sections, registry order.
    pub managers: Vec<ManagerReport>,
}

impl EntryPool {
    /// Builds a read-only usage snapshot of the registry.
    ///
    /// Purely observational: no manager state is mutated and the free-list
    /// traversal only reads links.
    #[must_use]
    pub fn report(&self) -> PoolReport {
        let managers = self
            .managers()
            .map(|manager| {
                let census = manager.census();
                ManagerReport {
                    instances: manager.instances(),
                    entry_size: manager.entry_size(),
                    block_capacity: manager.block_capacity(),
                    block_count: manager.block_count(),
                    in_use: census.in_use,
                    unused_tail: manager.unused_tail(),
                    reusable: census.reusable,
                    extra: census.extra,
                }
            })
            .collect();
        PoolReport {
            capacity: ROOT_SIZE,
            block_entries: BLOCK_ENTRIES,
            managers,
        }
    }

    /// Writes the human-readable report to the process log sink.
    pub fn log_report(&self) {
        let report = self.report();
        tracing::info!("{report}");
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry pool report:")?;
        writeln!(f, "root array size     : {}", self.capacity)?;
        writeln!(f, "root entry managers : {}", self.managers.len())?;
        writeln!(f, "entries per block   : {}", self.block_entries)?;
        for (index, manager) in self.managers.iter().enumerate() {
            writeln!(f, "[entry manager #{index}]")?;
            write!(f, "{manager}")?;
        }
        write!(f, "end of report")
    }
}

impl fmt::Display for ManagerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tinstances          : {}", self.instances)?;
        writeln!(f, "\tentry size         : {}", self.entry_size)?;
        writeln!(f, "\tblock array size   : {}", self.block_capacity)?;
        writeln!(f, "\tallocated blocks   : {}", self.block_count)?;
        writeln!(f, "\tentries being used : {}", self.in_use)?;
        writeln!(f, "\tunused entries     : {}", self.unused_tail)?;
        writeln!(f, "\treusable entries   : {}", self.reusable)?;
        if self.extra > 0 {
            writeln!(
                f,
                "\tWARNING - {} extra reusable entries were found",
                self.extra
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reflects_manager_state() {
        let mut pool = EntryPool::new();
        let handle = pool.acquire(24).unwrap();
        let _second = pool.acquire(24).unwrap();
        let a = pool.allocate(handle).unwrap();
        let _b = pool.allocate(handle).unwrap();
        let _c = pool.allocate(handle).unwrap();
        pool.free(handle, a);

        let report = pool.report();
        assert_eq!(report.capacity, ROOT_SIZE);
        assert_eq!(report.block_entries, BLOCK_ENTRIES);
        assert_eq!(report.managers.len(), 1);

        let manager = report.managers[0];
        assert_eq!(manager.instances, 2);
        assert_eq!(manager.entry_size, 24);
        assert_eq!(manager.block_count, 1);
        assert_eq!(manager.block_capacity, 3);
        assert_eq!(manager.in_use, 2);
        assert_eq!(manager.reusable, 1);
        assert_eq!(manager.unused_tail, BLOCK_ENTRIES - 3);
        assert_eq!(manager.extra, 0);
    }

    #[test]
    fn test_report_does_not_mutate_state() {
        let mut pool = EntryPool::new();
        let handle = pool.acquire(8).unwrap();
        let a = pool.allocate(handle).unwrap();
        let b = pool.allocate(handle).unwrap();
        pool.free(handle, a);
        pool.free(handle, b);

        let before = pool.report();
        let after = pool.report();
        assert_eq!(before.managers, after.managers);

        // Reuse order is untouched by the traversals.
        assert_eq!(pool.allocate(handle).unwrap(), b);
        assert_eq!(pool.allocate(handle).unwrap(), a);
    }

    #[test]
    fn test_report_display_layout() {
        let mut pool = EntryPool::new();
        let handle = pool.acquire(8).unwrap();
        let _entry = pool.allocate(handle).unwrap();

        let rendered = pool.report().to_string();
        assert!(rendered.starts_with("entry pool report:"));
        assert!(rendered.contains("root entry managers : 1"));
        assert!(rendered.contains("[entry manager #0]"));
        assert!(rendered.contains("\tentries being used : 1"));
        assert!(rendered.ends_with("end of report"));
        assert!(!rendered.contains("WARNING"));
    }

    #[test]
    fn test_manager_display_warns_on_extra_entries() {
        let manager = ManagerReport {
            instances: 1,
            entry_size: 8,
            block_capacity: 3,
            block_count: 1,
            in_use: 0,
            unused_tail: BLOCK_ENTRIES - 2,
            reusable: 2,
            extra: 1,
        };

        let rendered = manager.to_string();
        assert!(rendered.contains("\treusable entries   : 2"));
        assert!(rendered.contains("\tWARNING - 1 extra reusable entries were found"));
    }

    #[test]
    fn test_empty_pool_report() {
        let pool = EntryPool::new();
        let report = pool.report();
        assert!(report.managers.is_empty());
        assert!(report.to_string().contains("root entry managers : 0"));
    }
}
