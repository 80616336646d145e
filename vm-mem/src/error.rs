//! Error types for the paging simulator core.
//!
//! The core has no runtime error path: once a [`crate::Simulator`] exists,
//! every address resolves to a hit, an allocation or an eviction. The only
//! failures are configuration problems, which are caught before anything is
//! constructed.

use thiserror::Error;

/// Configuration errors, detected before a simulation starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one page table level is required")]
    NoLevels,

    #[error("Level {level} page table must be at least 1 bit")]
    ZeroLevelBits { level: usize },

    #[error("Too many bits used in page tables: {total} bits exceeds the {max}-bit address")]
    TooManyBits { total: u32, max: u32 },

    #[error("Number of available frames must be a number and greater than 0")]
    ZeroFrames,

    #[error("Bit string update interval must be a number and greater than 0")]
    ZeroInterval,

    #[error("Failed to load configuration from {path}: {message}")]
    Load { path: String, message: String },
}
