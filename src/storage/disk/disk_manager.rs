use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

/// Result type for disk manager operations
pub type Result<T> = std::result::Result<T, DiskManagerError>;

/// DiskManager handles the raw file I/O: fixed-size page reads and writes
/// against the database file, append-only writes against the log file, and
/// page id allocation with a deallocation free pool.
pub struct DiskManager {
    db_file: Mutex<File>,
    log_file: Mutex<File>,
    log_path: PathBuf,
    next_page_id: AtomicI32,
    free_pages: Mutex<Vec<PageId>>,
}

impl DiskManager {
    /// Open (or create) the database file at `db_path`. The log file lives
    /// next to it with a `.wal` extension.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let db_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;

        let log_path = db_path.with_extension("wal");
        let log_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&log_path)?;

        // Resume allocation after the last page already on disk.
        let file_len = db_file.metadata()?.len();
        let next_page_id = (file_len / PAGE_SIZE as u64) as PageId;

        Ok(Self {
            db_file: Mutex::new(db_file),
            log_file: Mutex::new(log_file),
            log_path,
            next_page_id: AtomicI32::new(next_page_id),
            free_pages: Mutex::new(Vec::new()),
        })
    }

    /// Read a page into `buf`. A page past the end of the file reads as
    /// zeroes (a freshly allocated page that was never written).
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        if page_id < 0 {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.db_file.lock();

        let file_len = file.metadata()?.len();
        if offset >= file_len {
            buf.fill(0);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Write a page to its slot in the database file.
    pub fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        if page_id < 0 {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(())
    }

    /// Allocate a page id, preferring ids returned by `deallocate_page`.
    pub fn allocate_page(&self) -> PageId {
        if let Some(page_id) = self.free_pages.lock().pop() {
            return page_id;
        }
        self.next_page_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Return a page id to the free pool for reuse.
    pub fn deallocate_page(&self, page_id: PageId) {
        if page_id != INVALID_PAGE_ID {
            self.free_pages.lock().push(page_id);
        }
    }

    /// Whether the page's bytes ever reached the database file. Used by
    /// recovery to decide if a NEWPAGE record must be replayed.
    pub fn is_page_on_disk(&self, page_id: PageId) -> Result<bool> {
        if page_id < 0 {
            return Ok(false);
        }
        let file = self.db_file.lock();
        let file_len = file.metadata()?.len();
        Ok((page_id as u64 + 1) * PAGE_SIZE as u64 <= file_len)
    }

    /// Append `data` to the log file, followed by a durability barrier.
    pub fn write_log(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut file = self.log_file.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        file.sync_data()?;
        Ok(())
    }

    /// Read up to `buf.len()` log bytes starting at `offset`. Bytes past the
    /// end of the file are zeroed. Returns false once `offset` is at or past
    /// the end of the log.
    pub fn read_log(&self, buf: &mut [u8], offset: u64) -> Result<bool> {
        let mut file = self.log_file.lock();
        let file_len = file.metadata()?.len();
        if offset >= file_len {
            return Ok(false);
        }

        buf.fill(0);
        let available = ((file_len - offset) as usize).min(buf.len());
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf[..available])?;
        Ok(true)
    }

    /// Size of the log file in bytes.
    pub fn log_len(&self) -> Result<u64> {
        Ok(self.log_file.lock().metadata()?.len())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_disk_manager() -> (DiskManager, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(file.path()).unwrap();
        (dm, file)
    }

    #[test]
    fn test_page_round_trip() {
        let (dm, _file) = create_disk_manager();

        let page_id = dm.allocate_page();
        let mut buf = [0u8; PAGE_SIZE];
        buf[0] = 0xAB;
        buf[PAGE_SIZE - 1] = 0xCD;
        dm.write_page(page_id, &buf).unwrap();

        let mut read_buf = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut read_buf).unwrap();
        assert_eq!(read_buf[0], 0xAB);
        assert_eq!(read_buf[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_fresh_page_reads_zeroed() {
        let (dm, _file) = create_disk_manager();

        let page_id = dm.allocate_page();
        let mut buf = [0xFFu8; PAGE_SIZE];
        dm.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        assert!(!dm.is_page_on_disk(page_id).unwrap());
    }

    #[test]
    fn test_deallocate_reuses_page_id() {
        let (dm, _file) = create_disk_manager();

        let first = dm.allocate_page();
        let second = dm.allocate_page();
        assert_eq!(second, first + 1);

        dm.deallocate_page(first);
        assert_eq!(dm.allocate_page(), first);
        assert_eq!(dm.allocate_page(), second + 1);
    }

    #[test]
    fn test_log_append_and_read() {
        let (dm, _file) = create_disk_manager();

        dm.write_log(b"hello").unwrap();
        dm.write_log(b" world").unwrap();

        let mut buf = [0u8; 16];
        assert!(dm.read_log(&mut buf, 0).unwrap());
        assert_eq!(&buf[..11], b"hello world");

        // Offset past the end reports end of log
        assert!(!dm.read_log(&mut buf, 11).unwrap());
    }
}
