use thiserror::Error;

use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum BTreeError {
    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),

    #[error("Header page is full")]
    HeaderPageFull,
}

/// Result type for B+tree operations
pub type Result<T> = std::result::Result<T, BTreeError>;
