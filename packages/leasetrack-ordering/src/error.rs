use leasetrack_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, OrderError>;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Key generation exhausted: {0}")]
    KeyGenerationExhausted(String),

    #[error("Order key too long: {len} > {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("Index out of bounds: {index} (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OrderError {
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Store failures a command absorbs as `ReorderOutcome::RolledBack`
    ///
    /// Anything else is still rolled back but surfaces to the caller.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Timeout(_))
    }
}
