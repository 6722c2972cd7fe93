use std::sync::Arc;

use parking_lot::Mutex;

mod common;
use common::rid;

use tarndb::common::types::Rid;
use tarndb::transaction::concurrency::{
    LockManager, TableHeap, Transaction, TransactionManager, TransactionState, WriteRecord,
    WriteType,
};

/// Records every collaborator call so tests can assert rollback order.
#[derive(Default)]
struct RecordingTable {
    calls: Mutex<Vec<(String, Rid)>>,
}

impl RecordingTable {
    fn calls(&self) -> Vec<(String, Rid)> {
        self.calls.lock().clone()
    }
}

impl TableHeap for RecordingTable {
    fn apply_delete(&self, rid: Rid, _txn: &Transaction) {
        self.calls.lock().push(("apply_delete".to_string(), rid));
    }

    fn rollback_delete(&self, rid: Rid, _txn: &Transaction) {
        self.calls.lock().push(("rollback_delete".to_string(), rid));
    }

    fn update_tuple(&self, _tuple: &[u8], rid: Rid, _txn: &Transaction) -> bool {
        self.calls.lock().push(("update_tuple".to_string(), rid));
        true
    }
}

fn write_record(table: &Arc<RecordingTable>, wtype: WriteType, r: Rid) -> WriteRecord {
    let table: Arc<dyn TableHeap> = table.clone();
    WriteRecord {
        rid: r,
        wtype,
        tuple: vec![0xAB],
        table,
    }
}

#[test]
fn test_commit_applies_pending_deletes() {
    let lock_manager = Arc::new(LockManager::new(false));
    let txn_manager = TransactionManager::new(lock_manager, None);
    let table = Arc::new(RecordingTable::default());

    let txn = txn_manager.begin();
    txn.add_write_record(write_record(&table, WriteType::Insert, rid(0, 1)));
    txn.add_write_record(write_record(&table, WriteType::Delete, rid(0, 2)));
    txn.add_write_record(write_record(&table, WriteType::Delete, rid(0, 3)));

    txn_manager.commit(&txn);

    // only the deferred deletes touch the table, newest first
    assert_eq!(
        table.calls(),
        vec![
            ("apply_delete".to_string(), rid(0, 3)),
            ("apply_delete".to_string(), rid(0, 2)),
        ]
    );
    assert_eq!(txn.state(), TransactionState::Committed);
}

#[test]
fn test_abort_rolls_back_in_reverse() {
    let lock_manager = Arc::new(LockManager::new(false));
    let txn_manager = TransactionManager::new(lock_manager, None);
    let table = Arc::new(RecordingTable::default());

    let txn = txn_manager.begin();
    txn.add_write_record(write_record(&table, WriteType::Insert, rid(0, 1)));
    txn.add_write_record(write_record(&table, WriteType::Update, rid(0, 2)));
    txn.add_write_record(write_record(&table, WriteType::Delete, rid(0, 3)));

    txn_manager.abort(&txn);

    assert_eq!(
        table.calls(),
        vec![
            ("rollback_delete".to_string(), rid(0, 3)),
            ("update_tuple".to_string(), rid(0, 2)),
            ("apply_delete".to_string(), rid(0, 1)),
        ]
    );
    assert_eq!(txn.state(), TransactionState::Aborted);
}

#[test]
fn test_aborted_by_wait_die_then_rolled_back() {
    let lock_manager = Arc::new(LockManager::new(false));
    let txn_manager = TransactionManager::new(lock_manager.clone(), None);
    let table = Arc::new(RecordingTable::default());

    let older = txn_manager.begin();
    let younger = txn_manager.begin();
    let contended = rid(0, 7);
    assert!(lock_manager.lock_exclusive(&older, contended));

    // the younger transaction did some work, then dies on the lock call
    younger.add_write_record(write_record(&table, WriteType::Insert, rid(0, 8)));
    assert!(!lock_manager.lock_shared(&younger, contended));
    assert_eq!(younger.state(), TransactionState::Aborted);

    // the caller aborts it, undoing its insert
    txn_manager.abort(&younger);
    assert_eq!(table.calls(), vec![("apply_delete".to_string(), rid(0, 8))]);

    txn_manager.commit(&older);
    assert!(older.holds_no_locks());
}
