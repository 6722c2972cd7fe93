pub mod log_manager;
pub mod log_record;
pub mod recovery;

pub use log_manager::LogManager;
pub use log_record::{LogRecord, LogRecordContent, LogRecordType};
pub use recovery::{RecoveryManager, TuplePageApplier};
