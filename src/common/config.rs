use std::time::Duration;

/// Default number of frames in the buffer pool
pub const BUFFER_POOL_SIZE: usize = 64;

/// Size of each of the two log buffers in bytes
pub const LOG_BUFFER_SIZE: usize = 4096;

/// Upper bound on how long the flush thread sleeps between forced flushes
pub const LOG_TIMEOUT: Duration = Duration::from_secs(1);

/// Bucket capacity for the buffer pool's extendible hash page table
pub const BUCKET_SIZE: usize = 50;
