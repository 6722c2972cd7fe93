use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::common::types::{Rid, TxnId};
use crate::transaction::concurrency::transaction::{Transaction, TransactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy)]
struct LockEntry {
    mode: LockMode,
    txn_id: TxnId,
}

/// Tuple-granularity lock manager with wait-die deadlock prevention.
///
/// One queue of granted locks per RID, one condition variable per RID, one
/// mutex over the whole table. A transaction's wait-die priority is the
/// instant it first successfully acquired any lock; a requester younger
/// than an incompatible holder dies (returns false, transaction ABORTED)
/// instead of waiting.
///
/// With `strict` set, unlock is rejected until the transaction reaches a
/// terminal state, so the transaction manager releases everything after
/// COMMIT/ABORT.
pub struct LockManager {
    strict: bool,
    inner: Mutex<LockTable>,
}

struct LockTable {
    queues: HashMap<Rid, Vec<LockEntry>>,
    conditions: HashMap<Rid, Arc<Condvar>>,
    /// first-acquisition timestamps, erased with the last unlock
    timestamps: HashMap<TxnId, Instant>,
}

impl LockManager {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            inner: Mutex::new(LockTable {
                queues: HashMap::new(),
                conditions: HashMap::new(),
                timestamps: HashMap::new(),
            }),
        }
    }

    /// Acquire a shared lock on `rid`. Blocks while an exclusive holder is
    /// present, unless wait-die kills the request first.
    pub fn lock_shared(&self, txn: &Transaction, rid: Rid) -> bool {
        if txn.state() != TransactionState::Growing {
            return false;
        }

        let mut table = self.inner.lock();
        loop {
            let compatible = table
                .queues
                .get(&rid)
                .map_or(true, |q| q.iter().all(|e| e.mode != LockMode::Exclusive));

            if compatible {
                table.grant(txn, rid, LockMode::Shared);
                txn.shared_lock_set().insert(rid);
                self.check(txn, rid);
                return true;
            }

            if table.dies_waiting(txn, rid, LockMode::Shared) {
                txn.set_state(TransactionState::Aborted);
                return false;
            }

            let condition = table.condition(rid);
            condition.wait(&mut table);
        }
    }

    /// Acquire an exclusive lock on `rid`. Blocks until the queue is empty,
    /// unless wait-die kills the request first.
    pub fn lock_exclusive(&self, txn: &Transaction, rid: Rid) -> bool {
        if txn.state() != TransactionState::Growing {
            return false;
        }

        let mut table = self.inner.lock();
        loop {
            let compatible = table.queues.get(&rid).map_or(true, |q| q.is_empty());

            if compatible {
                table.grant(txn, rid, LockMode::Exclusive);
                txn.exclusive_lock_set().insert(rid);
                self.check(txn, rid);
                return true;
            }

            if table.dies_waiting(txn, rid, LockMode::Exclusive) {
                txn.set_state(TransactionState::Aborted);
                return false;
            }

            let condition = table.condition(rid);
            condition.wait(&mut table);
        }
    }

    /// Upgrade an already-held shared lock to exclusive. Blocks until the
    /// caller is the sole holder.
    pub fn lock_upgrade(&self, txn: &Transaction, rid: Rid) -> bool {
        if txn.state() != TransactionState::Growing {
            return false;
        }

        let mut table = self.inner.lock();
        let holds_shared = table.queues.get(&rid).is_some_and(|q| {
            q.iter()
                .any(|e| e.txn_id == txn.id() && e.mode == LockMode::Shared)
        });
        assert!(holds_shared, "lock_upgrade without a shared lock on {}", rid);

        loop {
            let sole_holder = table.queues.get(&rid).is_some_and(|q| {
                q.len() == 1 && q[0].txn_id == txn.id() && q[0].mode == LockMode::Shared
            });

            if sole_holder {
                let queue = table.queues.get_mut(&rid).unwrap();
                queue.clear();
                queue.push(LockEntry {
                    mode: LockMode::Exclusive,
                    txn_id: txn.id(),
                });
                txn.shared_lock_set().remove(&rid);
                txn.exclusive_lock_set().insert(rid);
                self.check(txn, rid);
                return true;
            }

            if table.dies_waiting(txn, rid, LockMode::Exclusive) {
                txn.set_state(TransactionState::Aborted);
                return false;
            }

            let condition = table.condition(rid);
            condition.wait(&mut table);
        }
    }

    /// Release the lock `txn` holds on `rid`. The first unlock moves the
    /// transaction from GROWING to SHRINKING; under strict 2PL, unlock is
    /// rejected before the transaction is terminal.
    pub fn unlock(&self, txn: &Transaction, rid: Rid) -> bool {
        let state = txn.state();
        if self.strict
            && !matches!(state, TransactionState::Committed | TransactionState::Aborted)
        {
            return false;
        }
        if state == TransactionState::Growing {
            txn.set_state(TransactionState::Shrinking);
        }

        txn.shared_lock_set().remove(&rid);
        txn.exclusive_lock_set().remove(&rid);

        let mut table = self.inner.lock();
        let Some(queue) = table.queues.get_mut(&rid) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|e| e.txn_id == txn.id()) else {
            return false;
        };
        queue.remove(pos);

        if queue.is_empty() {
            table.queues.remove(&rid);
        }
        if txn.holds_no_locks() {
            table.timestamps.remove(&txn.id());
        }

        if let Some(condition) = table.conditions.get(&rid) {
            condition.notify_all();
            if !table.queues.contains_key(&rid) {
                table.conditions.remove(&rid);
            }
        }
        true
    }

    /// A RID must never sit in both of a transaction's lock sets.
    fn check(&self, txn: &Transaction, rid: Rid) {
        let both =
            txn.shared_lock_set().contains(&rid) && txn.exclusive_lock_set().contains(&rid);
        assert!(!both, "{} in both lock sets of txn {}", rid, txn.id());
    }
}

impl LockTable {
    fn grant(&mut self, txn: &Transaction, rid: Rid, mode: LockMode) {
        self.queues.entry(rid).or_default().push(LockEntry {
            mode,
            txn_id: txn.id(),
        });
        // the wait-die priority is fixed at the first successful acquisition
        self.timestamps.entry(txn.id()).or_insert_with(Instant::now);
    }

    fn condition(&mut self, rid: Rid) -> Arc<Condvar> {
        self.conditions
            .entry(rid)
            .or_insert_with(|| Arc::new(Condvar::new()))
            .clone()
    }

    /// Wait-die: the requester dies if it is younger than any incompatible
    /// holder. A transaction that has not acquired anything yet is younger
    /// than every holder.
    fn dies_waiting(&self, txn: &Transaction, rid: Rid, mode: LockMode) -> bool {
        let my_timestamp = self.timestamps.get(&txn.id()).copied();

        let Some(queue) = self.queues.get(&rid) else {
            return false;
        };
        queue
            .iter()
            .filter(|e| e.txn_id != txn.id())
            .filter(|e| mode == LockMode::Exclusive || e.mode == LockMode::Exclusive)
            .any(|holder| match self.timestamps.get(&holder.txn_id) {
                Some(&holder_timestamp) => match my_timestamp {
                    Some(mine) => mine > holder_timestamp,
                    None => true,
                },
                None => false,
            })
    }
}
