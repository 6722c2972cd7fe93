use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::config::BUCKET_SIZE;
use crate::common::types::{FrameId, PageId, INVALID_PAGE_ID};
use crate::storage::buffer::error::{BufferPoolError, Result};
use crate::storage::buffer::replacer::ClockReplacer;
use crate::storage::disk::DiskManager;
use crate::storage::hash::ExtendibleHashTable;
use crate::storage::page::{page_lsn, Page, PagePtr};
use crate::transaction::wal::log_manager::LogManager;

/// The buffer pool: a fixed array of frames, a page table mapping resident
/// page ids to frames, a free list, a clock replacer over unpinned frames,
/// and a dirty-page set.
///
/// One mutex serialises the five public operations. Page content latches
/// are acquired by callers that already hold a pinned frame, never under
/// this mutex.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<PagePtr>,
    inner: Mutex<PoolInner>,
    disk_manager: Arc<DiskManager>,
    log_manager: Option<Arc<LogManager>>,
}

struct PoolInner {
    page_table: ExtendibleHashTable<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: ClockReplacer<FrameId>,
    dirty_pages: HashSet<PageId>,
}

impl BufferPoolManager {
    /// Create a buffer pool without write-ahead logging.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::build(pool_size, disk_manager, None)
    }

    /// Create a buffer pool that enforces the WAL rule at eviction through
    /// `log_manager`.
    pub fn new_with_wal(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Arc<LogManager>,
    ) -> Self {
        Self::build(pool_size, disk_manager, Some(log_manager))
    }

    fn build(
        pool_size: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(pool_size > 0);
        let frames: Vec<PagePtr> = (0..pool_size).map(|_| Arc::new(Page::new())).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).collect();

        Self {
            pool_size,
            frames,
            inner: Mutex::new(PoolInner {
                page_table: ExtendibleHashTable::new(BUCKET_SIZE),
                free_list,
                replacer: ClockReplacer::new(),
                dirty_pages: HashSet::new(),
            }),
            disk_manager,
            log_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    /// Fetch a page, pinning its frame. Reads from disk on a miss, evicting
    /// a victim frame if necessary.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut inner = self.inner.lock();

        if let Some(frame_id) = inner.page_table.find(&page_id) {
            let page = &self.frames[frame_id];
            if page.pin() == 1 {
                // no longer an eviction candidate
                inner.replacer.erase(&frame_id);
            }
            return Ok(page.clone());
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let page = &self.frames[frame_id];

        {
            let mut data = page.write_latch();
            self.disk_manager.read_page(page_id, &mut data)?;
        }
        page.set_page_id(page_id);
        page.set_pin_count(1);
        page.set_dirty(false);
        inner.page_table.insert(page_id, frame_id);

        Ok(page.clone())
    }

    /// Allocate a fresh page on disk and pin it in a zeroed frame.
    pub fn new_page(&self) -> Result<(PagePtr, PageId)> {
        let mut inner = self.inner.lock();

        let frame_id = self.acquire_frame(&mut inner)?;
        let page_id = self.disk_manager.allocate_page();
        let page = &self.frames[frame_id];

        page.write_latch().fill(0);
        page.set_page_id(page_id);
        page.set_pin_count(1);
        page.set_dirty(false);
        inner.page_table.insert(page_id, frame_id);

        Ok((page.clone(), page_id))
    }

    /// Unpin a page, merging `is_dirty` into the frame's sticky dirty flag.
    /// Returns false if the page is not resident.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock();

        let Some(frame_id) = inner.page_table.find(&page_id) else {
            return false;
        };
        let page = &self.frames[frame_id];
        assert!(page.pin_count() > 0, "unpinning page {} with pin count 0", page_id);

        if is_dirty {
            page.set_dirty(true);
        }
        if page.is_dirty() {
            inner.dirty_pages.insert(page_id);
        }
        if page.unpin() == 0 {
            inner.replacer.insert(frame_id);
        }
        true
    }

    /// Write a resident dirty page back to disk. Returns Ok(false) if the
    /// page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock();

        let Some(frame_id) = inner.page_table.find(&page_id) else {
            return Ok(false);
        };
        let page = &self.frames[frame_id];
        if page.is_dirty() {
            let data = page.read_latch();
            self.disk_manager.write_page(page_id, &data)?;
            page.set_dirty(false);
            inner.dirty_pages.remove(&page_id);
        }
        Ok(true)
    }

    /// Flush every dirty page in the pool.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        let dirty: Vec<PageId> = inner.dirty_pages.iter().copied().collect();
        for page_id in dirty {
            let Some(frame_id) = inner.page_table.find(&page_id) else {
                continue;
            };
            let page = &self.frames[frame_id];
            if page.is_dirty() {
                let data = page.read_latch();
                self.disk_manager.write_page(page_id, &data)?;
                page.set_dirty(false);
            }
            inner.dirty_pages.remove(&page_id);
        }
        Ok(())
    }

    /// Remove a page from the pool and return its id to the disk allocator.
    /// Fails (returns false) while the page is pinned; a concurrent thread
    /// may still be about to unpin it.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();

        let Some(frame_id) = inner.page_table.find(&page_id) else {
            return false;
        };
        let page = &self.frames[frame_id];
        if page.pin_count() > 0 {
            return false;
        }

        inner.page_table.remove(&page_id);
        inner.replacer.erase(&frame_id);
        inner.dirty_pages.remove(&page_id);
        page.reset();
        self.disk_manager.deallocate_page(page_id);
        inner.free_list.push_back(frame_id);
        true
    }

    /// Pin count of a resident page, for tests and assertions.
    pub fn pin_count_of(&self, page_id: PageId) -> Option<i32> {
        let inner = self.inner.lock();
        inner
            .page_table
            .find(&page_id)
            .map(|frame_id| self.frames[frame_id].pin_count())
    }

    /// Obtain a reusable frame: free list first, then the replacer. A dirty
    /// victim is written back first, after waiting out the WAL rule if its
    /// page LSN is not yet durable.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = inner
            .replacer
            .victim()
            .ok_or(BufferPoolError::PoolExhausted)?;
        let page = &self.frames[frame_id];
        debug_assert_eq!(page.pin_count(), 0);
        let old_page_id = page.page_id();

        if page.is_dirty() {
            // The victim is unpinned, so its latch is free by invariant and
            // this read cannot block.
            let data = page.read_latch();
            if let Some(log_manager) = &self.log_manager {
                let lsn = page_lsn(&data);
                if log_manager.is_enabled() && lsn > log_manager.persistent_lsn() {
                    debug!(
                        "eviction of page {} waits for log flush up to lsn {}",
                        old_page_id, lsn
                    );
                    let done = log_manager.request_flush();
                    let _ = done.recv();
                }
            }
            self.disk_manager.write_page(old_page_id, &data)?;
            page.set_dirty(false);
            inner.dirty_pages.remove(&old_page_id);
        }

        if old_page_id != INVALID_PAGE_ID {
            inner.page_table.remove(&old_page_id);
        }
        Ok(frame_id)
    }
}
