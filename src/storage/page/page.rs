use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::common::types::{Lsn, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// Raw content of one page
pub type PageData = [u8; PAGE_SIZE];

/// Owned read latch on a page's content
pub type PageReadGuard = ArcRwLockReadGuard<RawRwLock, PageData>;

/// Owned write latch on a page's content
pub type PageWriteGuard = ArcRwLockWriteGuard<RawRwLock, PageData>;

/// A buffer pool frame: a page-sized byte buffer behind a reader-writer
/// latch, plus the bookkeeping the buffer pool needs (resident page id, pin
/// count, dirty flag).
///
/// The latch guards only the content. The bookkeeping fields are mutated
/// exclusively under the buffer pool's mutex, so a thread holding a pinned
/// frame may latch its content without touching that mutex.
pub struct Page {
    data: Arc<RwLock<PageData>>,
    page_id: AtomicI32,
    pin_count: AtomicI32,
    is_dirty: AtomicBool,
}

/// Shared handle to a frame
pub type PagePtr = Arc<Page>;

impl Page {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new([0u8; PAGE_SIZE])),
            page_id: AtomicI32::new(INVALID_PAGE_ID),
            pin_count: AtomicI32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Acquire the content read latch.
    pub fn read_latch(&self) -> PageReadGuard {
        self.data.read_arc()
    }

    /// Acquire the content write latch.
    pub fn write_latch(&self) -> PageWriteGuard {
        self.data.write_arc()
    }

    pub fn page_id(&self) -> PageId {
        self.page_id.load(Ordering::SeqCst)
    }

    pub fn pin_count(&self) -> i32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::SeqCst)
    }

    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id, Ordering::SeqCst);
    }

    pub(crate) fn set_pin_count(&self, pins: i32) {
        self.pin_count.store(pins, Ordering::SeqCst);
    }

    /// Increment the pin count and return the new value.
    pub(crate) fn pin(&self) -> i32 {
        self.pin_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the pin count and return the new value.
    pub(crate) fn unpin(&self) -> i32 {
        self.pin_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::SeqCst);
    }

    /// Reset the frame to its free state.
    pub(crate) fn reset(&self) {
        self.write_latch().fill(0);
        self.page_id.store(INVALID_PAGE_ID, Ordering::SeqCst);
        self.pin_count.store(0, Ordering::SeqCst);
        self.is_dirty.store(false, Ordering::SeqCst);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// Every page managed by this crate stores its LSN in bytes 0..4 so the
/// buffer pool and recovery can read it without knowing the page type.
pub fn page_lsn(data: &PageData) -> Lsn {
    LittleEndian::read_i32(&data[0..4])
}

pub fn set_page_lsn(data: &mut PageData, lsn: Lsn) {
    LittleEndian::write_i32(&mut data[0..4], lsn);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_tracking() {
        let page = Page::new();
        assert_eq!(page.pin_count(), 0);
        assert_eq!(page.pin(), 1);
        assert_eq!(page.pin(), 2);
        assert_eq!(page.unpin(), 1);
        assert_eq!(page.unpin(), 0);
    }

    #[test]
    fn test_page_lsn_round_trip() {
        let page = Page::new();
        {
            let mut guard = page.write_latch();
            set_page_lsn(&mut guard, 1234);
        }
        let guard = page.read_latch();
        assert_eq!(page_lsn(&guard), 1234);
    }

    #[test]
    fn test_reset_clears_state() {
        let page = Page::new();
        page.set_page_id(9);
        page.set_dirty(true);
        page.pin();
        page.reset();
        assert_eq!(page.page_id(), INVALID_PAGE_ID);
        assert_eq!(page.pin_count(), 0);
        assert!(!page.is_dirty());
    }
}
