use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::common::types::{Lsn, Rid, TxnId, INVALID_LSN};
use crate::storage::page::{PagePtr, PageReadGuard, PageWriteGuard};

/// Transaction states under two-phase locking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

/// Kinds of writes tracked for rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    Insert,
    Delete,
    Update,
}

/// The table-heap interface the core requires from its collaborator. The
/// transaction manager applies deletes on commit and rolls writes back on
/// abort through these calls; the implementation honours the tuple locks it
/// holds.
pub trait TableHeap: Send + Sync {
    /// Physically remove the tuple at `rid`.
    fn apply_delete(&self, rid: Rid, txn: &Transaction);

    /// Revert a mark-delete on the tuple at `rid`.
    fn rollback_delete(&self, rid: Rid, txn: &Transaction);

    /// Restore `tuple` at `rid`. Returns false if the slot is gone.
    fn update_tuple(&self, tuple: &[u8], rid: Rid, txn: &Transaction) -> bool;
}

/// One entry of a transaction's write set
pub struct WriteRecord {
    pub rid: Rid,
    pub wtype: WriteType,
    /// before-image for UPDATE rollback; unused otherwise
    pub tuple: Vec<u8>,
    pub table: Arc<dyn TableHeap>,
}

/// A page latch held by an index operation. Dropping the guard releases
/// the latch; the holder still owns a pin that must be returned separately.
pub enum PageLatch {
    Read(PageReadGuard),
    Write(PageWriteGuard),
}

/// A latched, pinned page tracked in the transaction's page set so every
/// exit path of an index operation releases it in one place.
pub struct LatchedPage {
    pub page: PagePtr,
    pub latch: PageLatch,
    /// whether the holder modified the page through this latch
    pub dirty: bool,
}

impl LatchedPage {
    pub fn write(page: PagePtr, guard: PageWriteGuard) -> Self {
        Self {
            page,
            latch: PageLatch::Write(guard),
            dirty: false,
        }
    }

    pub fn read(page: PagePtr, guard: PageReadGuard) -> Self {
        Self {
            page,
            latch: PageLatch::Read(guard),
            dirty: false,
        }
    }

    pub fn write_guard(&mut self) -> &mut PageWriteGuard {
        match &mut self.latch {
            PageLatch::Write(guard) => guard,
            PageLatch::Read(_) => panic!("write access through a read latch"),
        }
    }
}

/// An active transaction: identity, 2PL state, log position, lock sets,
/// the write set used for rollback, and the page set of latches held
/// during index operations.
pub struct Transaction {
    txn_id: TxnId,
    state: Mutex<TransactionState>,
    prev_lsn: AtomicI32,
    shared_lock_set: Mutex<HashSet<Rid>>,
    exclusive_lock_set: Mutex<HashSet<Rid>>,
    write_set: Mutex<Vec<WriteRecord>>,
    page_set: Mutex<VecDeque<LatchedPage>>,
}

impl Transaction {
    pub fn new(txn_id: TxnId) -> Self {
        Self {
            txn_id,
            state: Mutex::new(TransactionState::Growing),
            prev_lsn: AtomicI32::new(INVALID_LSN),
            shared_lock_set: Mutex::new(HashSet::new()),
            exclusive_lock_set: Mutex::new(HashSet::new()),
            write_set: Mutex::new(Vec::new()),
            page_set: Mutex::new(VecDeque::new()),
        }
    }

    pub fn id(&self) -> TxnId {
        self.txn_id
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock() = state;
    }

    pub fn prev_lsn(&self) -> Lsn {
        self.prev_lsn.load(Ordering::SeqCst)
    }

    pub fn set_prev_lsn(&self, lsn: Lsn) {
        self.prev_lsn.store(lsn, Ordering::SeqCst);
    }

    pub fn shared_lock_set(&self) -> MutexGuard<'_, HashSet<Rid>> {
        self.shared_lock_set.lock()
    }

    pub fn exclusive_lock_set(&self) -> MutexGuard<'_, HashSet<Rid>> {
        self.exclusive_lock_set.lock()
    }

    /// True if the transaction holds no tuple locks at all.
    pub fn holds_no_locks(&self) -> bool {
        self.shared_lock_set.lock().is_empty() && self.exclusive_lock_set.lock().is_empty()
    }

    pub fn add_write_record(&self, record: WriteRecord) {
        self.write_set.lock().push(record);
    }

    pub fn take_write_set(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut *self.write_set.lock())
    }

    pub fn page_set(&self) -> MutexGuard<'_, VecDeque<LatchedPage>> {
        self.page_set.lock()
    }

    pub fn push_latched_page(&self, page: LatchedPage) {
        self.page_set.lock().push_back(page);
    }

    pub fn pop_latched_page(&self) -> Option<LatchedPage> {
        self.page_set.lock().pop_back()
    }

    pub fn page_set_len(&self) -> usize {
        self.page_set.lock().len()
    }
}
