//! # Pool Error Types
//!
//! All errors that can occur in the entry pool.
//!
//! The original design of this system terminated the process on the fatal
//! tier (zero size, registry exhaustion, capacity overflow). Here those
//! conditions surface as error values so the embedding server decides
//! whether to abort or degrade.

use thiserror::Error;

/// Errors that can occur in the entry pool.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Requested a manager for entries of zero size.
    #[error("entry size must be greater than zero")]
    ZeroSize,

    /// Every registry slot already hosts a size class.
    #[error("size class registry full: capacity {capacity}")]
    RegistryFull {
        /// Maximum number of distinct size classes.
        capacity: usize,
    },

    /// Block bookkeeping can no longer represent more entries.
    #[error("block capacity overflow for entry size {entry_size}")]
    CapacityOverflow {
        /// Entry size of the affected manager, in bytes.
        entry_size: u32,
    },

    /// The handle's manager was already released or torn down.
    #[error("pool handle is stale")]
    StaleHandle,
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
