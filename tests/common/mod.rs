use std::sync::Arc;

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use tempfile::NamedTempFile;

use tarndb::common::types::{PageId, Rid, HEADER_PAGE_ID, PAGE_SIZE};
use tarndb::storage::disk::DiskManager;
use tarndb::storage::page::PageData;
use tarndb::transaction::wal::recovery::TuplePageApplier;
use tarndb::transaction::wal::LogManager;
use tarndb::BufferPoolManager;

// Create a temporary database file for testing
#[allow(dead_code)]
pub fn create_test_disk() -> Result<(Arc<DiskManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let disk = Arc::new(DiskManager::new(file.path())?);
    Ok((disk, file))
}

// Create a buffer pool manager with a temporary database
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let (disk, file) = create_test_disk()?;
    Ok((Arc::new(BufferPoolManager::new(pool_size, disk)), file))
}

// Create a WAL-enabled buffer pool with its log manager
#[allow(dead_code)]
pub fn create_test_buffer_pool_with_wal(
    pool_size: usize,
) -> Result<(Arc<BufferPoolManager>, Arc<LogManager>, NamedTempFile)> {
    let (disk, file) = create_test_disk()?;
    let log_manager = Arc::new(LogManager::new(disk.clone())?);
    let buffer_pool = Arc::new(BufferPoolManager::new_with_wal(
        pool_size,
        disk,
        log_manager.clone(),
    ));
    Ok((buffer_pool, log_manager, file))
}

// Buffer pool with the header page (page 0) allocated, ready for indexes
#[allow(dead_code)]
pub fn create_tree_env(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let (buffer_pool, file) = create_test_buffer_pool(pool_size)?;
    let (_, header_pid) = buffer_pool.new_page()?;
    assert_eq!(header_pid, HEADER_PAGE_ID);
    buffer_pool.unpin_page(header_pid, true);
    Ok((buffer_pool, file))
}

#[allow(dead_code)]
pub fn key(value: i64) -> tarndb::IndexKey {
    tarndb::IndexKey::from_i64(value)
}

#[allow(dead_code)]
pub fn rid(page_id: PageId, slot: u32) -> Rid {
    Rid::new(page_id, slot)
}

// -- test table collaborator -------------------------------------------------
//
// A minimal slotted tuple page standing in for the external table heap:
// `page_lsn (4) | pad (4) | cells`, each cell `flag (1) | len (4) | data`.
// flag 0 = empty, 1 = present, 2 = mark-deleted.

#[allow(dead_code)]
pub const SLOT_CELL_SIZE: usize = 64;
#[allow(dead_code)]
pub const SLOT_DATA_SIZE: usize = SLOT_CELL_SIZE - 5;
#[allow(dead_code)]
pub const SLOT_COUNT: usize = (PAGE_SIZE - 8) / SLOT_CELL_SIZE;

#[allow(dead_code)]
fn cell_offset(slot: u32) -> usize {
    assert!((slot as usize) < SLOT_COUNT);
    8 + slot as usize * SLOT_CELL_SIZE
}

#[allow(dead_code)]
pub fn tuple_at(data: &PageData, slot: u32) -> Option<Vec<u8>> {
    let off = cell_offset(slot);
    if data[off] != 1 {
        return None;
    }
    let len = LittleEndian::read_u32(&data[off + 1..off + 5]) as usize;
    Some(data[off + 5..off + 5 + len].to_vec())
}

#[allow(dead_code)]
pub fn is_mark_deleted(data: &PageData, slot: u32) -> bool {
    data[cell_offset(slot)] == 2
}

#[allow(dead_code)]
pub struct SlotPageApplier;

impl TuplePageApplier for SlotPageApplier {
    fn redo_insert(&self, page: &mut PageData, rid: Rid, tuple: &[u8]) -> bool {
        if tuple.len() > SLOT_DATA_SIZE {
            return false;
        }
        let off = cell_offset(rid.slot);
        page[off] = 1;
        LittleEndian::write_u32(&mut page[off + 1..off + 5], tuple.len() as u32);
        page[off + 5..off + 5 + tuple.len()].copy_from_slice(tuple);
        true
    }

    fn redo_update(
        &self,
        page: &mut PageData,
        rid: Rid,
        _old_tuple: &[u8],
        new_tuple: &[u8],
    ) -> bool {
        let off = cell_offset(rid.slot);
        if page[off] != 1 || new_tuple.len() > SLOT_DATA_SIZE {
            return false;
        }
        LittleEndian::write_u32(&mut page[off + 1..off + 5], new_tuple.len() as u32);
        page[off + 5..off + 5 + new_tuple.len()].copy_from_slice(new_tuple);
        true
    }

    fn redo_mark_delete(&self, page: &mut PageData, rid: Rid) -> bool {
        let off = cell_offset(rid.slot);
        if page[off] != 1 {
            return false;
        }
        page[off] = 2;
        true
    }

    fn redo_apply_delete(&self, page: &mut PageData, rid: Rid) -> bool {
        let off = cell_offset(rid.slot);
        if page[off] == 0 {
            return false;
        }
        page[off..off + SLOT_CELL_SIZE].fill(0);
        true
    }

    fn redo_rollback_delete(&self, page: &mut PageData, rid: Rid) -> bool {
        let off = cell_offset(rid.slot);
        if page[off] != 2 {
            return false;
        }
        page[off] = 1;
        true
    }

    fn init_page(&self, page: &mut PageData, _page_id: PageId, _prev_page_id: PageId) {
        page.fill(0);
    }
}
