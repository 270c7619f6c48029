//! # REUSAGE Core - Entry Reusage Pool
//!
//! Size-class object pool for high-churn, fixed-size records (per-session
//! state, per-entity records) in a long-running server process:
//! - Entries are carved from large contiguous blocks, never from the
//!   general-purpose allocator one at a time
//! - Freed entries are recycled through an intrusive free list overlaid on
//!   the freed memory itself
//! - One reference-counted manager is shared by every caller of the same
//!   normalized entry size
//!
//! ## Architecture Rules
//!
//! 1. **No heap traffic on the reuse fast path** - allocate/free are O(1)
//! 2. **Blocks never move or shrink** - entry refs stay valid until the
//!    manager dies
//! 3. **Single-threaded** - callers serialize access externally
//!
//! ## Example
//!
//! ```rust,ignore
//! use reusage_core::EntryPool;
//!
//! let mut pool = EntryPool::new();
//! let sessions = pool.acquire(64)?;
//!
//! let entry = pool.allocate(sessions)?;
//! pool.entry_bytes_mut(sessions, entry).unwrap().fill(0xAB);
//!
//! pool.free(sessions, entry);
//! pool.release(sessions)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod block;
mod error;
mod free_list;
mod manager;
mod registry;
mod report;

/// Number of entries in each block.
pub const BLOCK_ENTRIES: u32 = 4096;

/// Maximum number of distinct size classes in the registry.
pub const ROOT_SIZE: usize = 256;

/// Alignment boundary for normalized entry sizes.
pub const ENTRY_ALIGN: u32 = 8;

/// Size of a packed free-list link in bytes.
///
/// Freed entries store the link in their own first bytes, so this is also
/// the minimum normalized entry size.
pub const LINK_BYTES: u32 = 8;

pub use error::{PoolError, PoolResult};
pub use free_list::EntryRef;
pub use registry::{EntryPool, PoolHandle};
pub use report::{ManagerReport, PoolReport};
