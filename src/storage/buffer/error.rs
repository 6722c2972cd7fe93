use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::disk::DiskManagerError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Disk error: {0}")]
    DiskError(#[from] DiskManagerError),

    #[error("Buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

/// Result type for buffer pool operations
pub type Result<T> = std::result::Result<T, BufferPoolError>;
