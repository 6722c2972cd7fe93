use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::common::config::LOG_BUFFER_SIZE;
use crate::common::types::{Lsn, PageId, Rid, TxnId};
use crate::storage::buffer::{BufferPoolError, BufferPoolManager};
use crate::storage::disk::{DiskManager, DiskManagerError};
use crate::storage::page::{page_lsn, set_page_lsn, PageData};
use crate::transaction::wal::log_record::{LogRecord, LogRecordContent, LogRecordType};

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Disk error: {0}")]
    DiskError(#[from] DiskManagerError),

    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),
}

/// Result type for recovery operations
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Tuple-level redo operations the recovery engine delegates to the table
/// collaborator. Each call mutates raw page bytes; a `false` return means
/// the page no longer admits the replay, which recovery treats as a fatal
/// inconsistency.
pub trait TuplePageApplier: Send + Sync {
    fn redo_insert(&self, page: &mut PageData, rid: Rid, tuple: &[u8]) -> bool;
    fn redo_update(&self, page: &mut PageData, rid: Rid, old_tuple: &[u8], new_tuple: &[u8])
        -> bool;
    fn redo_mark_delete(&self, page: &mut PageData, rid: Rid) -> bool;
    fn redo_apply_delete(&self, page: &mut PageData, rid: Rid) -> bool;
    fn redo_rollback_delete(&self, page: &mut PageData, rid: Rid) -> bool;
    fn init_page(&self, page: &mut PageData, page_id: PageId, prev_page_id: PageId);
}

/// Redo-only crash recovery. Scans the log from offset zero, rebuilding the
/// active-transaction table and reapplying every data operation whose
/// effects did not reach disk (`record.lsn > page_lsn`). Recovery itself
/// writes no log records; run it before the flush thread is started.
pub struct RecoveryManager {
    disk_manager: Arc<DiskManager>,
    buffer_pool: Arc<BufferPoolManager>,
    applier: Arc<dyn TuplePageApplier>,
    /// txn_id -> last LSN seen, pruned when a COMMIT is scanned
    active_txns: HashMap<TxnId, Lsn>,
}

impl RecoveryManager {
    pub fn new(
        disk_manager: Arc<DiskManager>,
        buffer_pool: Arc<BufferPoolManager>,
        applier: Arc<dyn TuplePageApplier>,
    ) -> Self {
        Self {
            disk_manager,
            buffer_pool,
            applier,
            active_txns: HashMap::new(),
        }
    }

    /// Transactions still in flight at the end of the log, with their last
    /// LSN. Populated by `redo`.
    pub fn active_transactions(&self) -> &HashMap<TxnId, Lsn> {
        &self.active_txns
    }

    /// Scan the log from the start and reapply lost effects.
    pub fn redo(&mut self) -> Result<()> {
        info!("redo: scanning log from offset 0");
        self.active_txns.clear();

        let mut buffer = vec![0u8; LOG_BUFFER_SIZE];
        // absolute log offset of buffer[0]
        let mut chunk_start: u64 = 0;
        let mut offset: usize = 0;

        if !self.disk_manager.read_log(&mut buffer, chunk_start)? {
            debug!("redo: log is empty");
            return Ok(());
        }

        let mut replayed = 0usize;
        loop {
            let record = match LogRecord::deserialize(&buffer[offset..]) {
                Some(record) => record,
                None => {
                    // Either the zero padding at the end of the log, or a
                    // record spliced across the chunk boundary: rewind the
                    // buffer to the record's own offset and refill. A refill
                    // that still fails to parse is the end of the log.
                    if offset == 0 {
                        break;
                    }
                    chunk_start += offset as u64;
                    offset = 0;
                    if !self.disk_manager.read_log(&mut buffer, chunk_start)? {
                        break;
                    }
                    continue;
                }
            };
            offset += record.size as usize;

            // There is no checkpointing: a transaction's BEGIN always
            // precedes its other records in the scan.
            if record.record_type == LogRecordType::Commit {
                self.active_txns.remove(&record.txn_id);
            } else {
                self.active_txns.insert(record.txn_id, record.lsn);
            }

            if self.replay(&record)? {
                replayed += 1;
            }
        }

        info!(
            "redo complete: {} operations reapplied, {} transactions still active",
            replayed,
            self.active_txns.len()
        );
        Ok(())
    }

    /// Reapply one record if its page predates it. Returns whether the page
    /// was modified.
    fn replay(&self, record: &LogRecord) -> Result<bool> {
        match &record.content {
            LogRecordContent::Transaction => Ok(false),
            LogRecordContent::Tuple { rid, tuple } => {
                self.replay_on_page(*rid, record, |applier, data| match record.record_type {
                    LogRecordType::Insert => applier.redo_insert(data, *rid, tuple),
                    LogRecordType::MarkDelete => applier.redo_mark_delete(data, *rid),
                    LogRecordType::ApplyDelete => applier.redo_apply_delete(data, *rid),
                    LogRecordType::RollbackDelete => applier.redo_rollback_delete(data, *rid),
                    _ => unreachable!(),
                })
            }
            LogRecordContent::Update {
                rid,
                old_tuple,
                new_tuple,
            } => self.replay_on_page(*rid, record, |applier, data| {
                applier.redo_update(data, *rid, old_tuple, new_tuple)
            }),
            LogRecordContent::NewPage {
                prev_page_id,
                page_id,
            } => {
                if self.disk_manager.is_page_on_disk(*page_id)? {
                    // the allocation reached disk; its page LSN is at or
                    // ahead of this record
                    return Ok(false);
                }
                debug!("redo: reallocating lost page {}", page_id);
                let (page, new_page_id) = self.buffer_pool.new_page()?;
                {
                    let mut data = page.write_latch();
                    self.applier.init_page(&mut data, new_page_id, *prev_page_id);
                    set_page_lsn(&mut data, record.lsn);
                }
                self.buffer_pool.unpin_page(new_page_id, true);
                Ok(true)
            }
        }
    }

    fn replay_on_page<F>(&self, rid: Rid, record: &LogRecord, apply: F) -> Result<bool>
    where
        F: FnOnce(&dyn TuplePageApplier, &mut PageData) -> bool,
    {
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let modified = {
            let mut data = page.write_latch();
            if record.lsn <= page_lsn(&data) {
                // the effect already persists on disk
                false
            } else {
                let applied = apply(self.applier.as_ref(), &mut data);
                assert!(
                    applied,
                    "redo of lsn {} failed on page {}: inconsistent page state",
                    record.lsn, rid.page_id
                );
                set_page_lsn(&mut data, record.lsn);
                true
            }
        };
        self.buffer_pool.unpin_page(rid.page_id, modified);
        Ok(modified)
    }
}
