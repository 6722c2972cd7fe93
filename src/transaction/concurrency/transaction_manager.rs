use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::debug;

use crate::common::types::Rid;
use crate::transaction::concurrency::lock_manager::LockManager;
use crate::transaction::concurrency::transaction::{Transaction, TransactionState, WriteType};
use crate::transaction::wal::log_manager::LogManager;
use crate::transaction::wal::log_record::LogRecord;

/// Creates transactions and drives commit/abort: log-record emission,
/// group-commit waiting, write-set application/rollback through the table
/// collaborator, and lock release.
pub struct TransactionManager {
    next_txn_id: AtomicI32,
    lock_manager: Arc<LockManager>,
    log_manager: Option<Arc<LogManager>>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>, log_manager: Option<Arc<LogManager>>) -> Self {
        Self {
            next_txn_id: AtomicI32::new(0),
            lock_manager,
            log_manager,
        }
    }

    /// Start a transaction. With logging enabled, writes its BEGIN record
    /// and seeds `prev_lsn`.
    pub fn begin(&self) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id));

        if let Some(log_manager) = self.enabled_log_manager() {
            let mut record = LogRecord::new_begin(txn_id);
            let lsn = log_manager
                .append_log_record(&mut record)
                .expect("failed to append BEGIN record");
            txn.set_prev_lsn(lsn);
        }

        txn
    }

    /// Commit: apply pending deletes, write the COMMIT record, wait for
    /// group commit, then release every lock.
    pub fn commit(&self, txn: &Transaction) {
        txn.set_state(TransactionState::Committed);

        // deletes are deferred until commit; everything else is in place
        let mut write_set = txn.take_write_set();
        while let Some(record) = write_set.pop() {
            if record.wtype == WriteType::Delete {
                record.table.apply_delete(record.rid, txn);
            }
        }

        if let Some(log_manager) = self.enabled_log_manager() {
            let mut record = LogRecord::new_commit(txn.id(), txn.prev_lsn());
            let commit_lsn = log_manager
                .append_log_record(&mut record)
                .expect("failed to append COMMIT record");

            // Group commit: wait for a flush to carry our record to disk
            // rather than forcing one.
            loop {
                let waiter = log_manager.register_commit_waiter();
                match waiter.recv() {
                    Ok(durable_lsn) if durable_lsn >= commit_lsn => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
            debug!("txn {} committed at lsn {}", txn.id(), commit_lsn);
        }

        self.release_all_locks(txn);
    }

    /// Abort: roll the write set back in reverse order, write the ABORT
    /// record, then release every lock.
    pub fn abort(&self, txn: &Transaction) {
        txn.set_state(TransactionState::Aborted);

        let mut write_set = txn.take_write_set();
        while let Some(record) = write_set.pop() {
            match record.wtype {
                WriteType::Delete => record.table.rollback_delete(record.rid, txn),
                WriteType::Insert => record.table.apply_delete(record.rid, txn),
                WriteType::Update => {
                    record.table.update_tuple(&record.tuple, record.rid, txn);
                }
            }
        }

        if let Some(log_manager) = self.enabled_log_manager() {
            let mut record = LogRecord::new_abort(txn.id(), txn.prev_lsn());
            log_manager
                .append_log_record(&mut record)
                .expect("failed to append ABORT record");
            debug!("txn {} aborted", txn.id());
        }

        self.release_all_locks(txn);
    }

    fn enabled_log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref().filter(|lm| lm.is_enabled())
    }

    fn release_all_locks(&self, txn: &Transaction) {
        let mut locked: Vec<Rid> = txn.shared_lock_set().iter().copied().collect();
        locked.extend(txn.exclusive_lock_set().iter().copied());
        for rid in locked {
            self.lock_manager.unlock(txn, rid);
        }
    }
}
