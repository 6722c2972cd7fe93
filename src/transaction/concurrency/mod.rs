pub mod lock_manager;
pub mod transaction;
pub mod transaction_manager;

pub use lock_manager::LockManager;
pub use transaction::{
    LatchedPage, PageLatch, TableHeap, Transaction, TransactionState, WriteRecord, WriteType,
};
pub use transaction_manager::TransactionManager;
