use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::common::types::{Lsn, PageId, Rid, TxnId, INVALID_LSN, RID_SIZE};

/// Error type for log record operations
#[derive(Error, Debug)]
pub enum LogRecordError {
    #[error("Log record does not fit in {0} bytes")]
    BufferTooSmall(usize),

    #[error("Unknown log record type: {0}")]
    UnknownType(u32),

    #[error("Truncated log record")]
    Truncated,
}

/// Result type for log record operations
pub type Result<T> = std::result::Result<T, LogRecordError>;

/// Fixed prefix of every log record:
/// `size (u32) | lsn (i32) | txn_id (i32) | prev_lsn (i32) | type (u32)`
pub const LOG_RECORD_HEADER_SIZE: usize = 20;

/// Types of log records supported by the WAL system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRecordType {
    Begin,
    Commit,
    Abort,
    Insert,
    Update,
    MarkDelete,
    ApplyDelete,
    RollbackDelete,
    NewPage,
}

impl LogRecordType {
    fn to_u32(self) -> u32 {
        match self {
            LogRecordType::Begin => 1,
            LogRecordType::Commit => 2,
            LogRecordType::Abort => 3,
            LogRecordType::Insert => 4,
            LogRecordType::Update => 5,
            LogRecordType::MarkDelete => 6,
            LogRecordType::ApplyDelete => 7,
            LogRecordType::RollbackDelete => 8,
            LogRecordType::NewPage => 9,
        }
    }

    fn from_u32(value: u32) -> Result<Self> {
        Ok(match value {
            1 => LogRecordType::Begin,
            2 => LogRecordType::Commit,
            3 => LogRecordType::Abort,
            4 => LogRecordType::Insert,
            5 => LogRecordType::Update,
            6 => LogRecordType::MarkDelete,
            7 => LogRecordType::ApplyDelete,
            8 => LogRecordType::RollbackDelete,
            9 => LogRecordType::NewPage,
            other => return Err(LogRecordError::UnknownType(other)),
        })
    }
}

/// Payload of a log record, depending on its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecordContent {
    /// BEGIN / COMMIT / ABORT carry no payload
    Transaction,
    /// INSERT and the three delete variants carry the tuple image
    Tuple { rid: Rid, tuple: Vec<u8> },
    /// UPDATE carries before and after images
    Update {
        rid: Rid,
        old_tuple: Vec<u8>,
        new_tuple: Vec<u8>,
    },
    /// NEWPAGE records a page allocation in a page chain
    NewPage { prev_page_id: PageId, page_id: PageId },
}

/// A write-ahead log record. `size` counts the prefix plus the payload;
/// `lsn` is assigned by the log manager on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub size: u32,
    pub lsn: Lsn,
    pub txn_id: TxnId,
    pub prev_lsn: Lsn,
    pub record_type: LogRecordType,
    pub content: LogRecordContent,
}

fn tuple_field_size(tuple: &[u8]) -> usize {
    4 + tuple.len()
}

impl LogRecord {
    fn new(txn_id: TxnId, prev_lsn: Lsn, record_type: LogRecordType, content: LogRecordContent) -> Self {
        let payload = match &content {
            LogRecordContent::Transaction => 0,
            LogRecordContent::Tuple { tuple, .. } => RID_SIZE + tuple_field_size(tuple),
            LogRecordContent::Update {
                old_tuple,
                new_tuple,
                ..
            } => RID_SIZE + tuple_field_size(old_tuple) + tuple_field_size(new_tuple),
            LogRecordContent::NewPage { .. } => 8,
        };

        Self {
            size: (LOG_RECORD_HEADER_SIZE + payload) as u32,
            lsn: INVALID_LSN,
            txn_id,
            prev_lsn,
            record_type,
            content,
        }
    }

    pub fn new_begin(txn_id: TxnId) -> Self {
        Self::new(txn_id, INVALID_LSN, LogRecordType::Begin, LogRecordContent::Transaction)
    }

    pub fn new_commit(txn_id: TxnId, prev_lsn: Lsn) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordType::Commit, LogRecordContent::Transaction)
    }

    pub fn new_abort(txn_id: TxnId, prev_lsn: Lsn) -> Self {
        Self::new(txn_id, prev_lsn, LogRecordType::Abort, LogRecordContent::Transaction)
    }

    pub fn new_insert(txn_id: TxnId, prev_lsn: Lsn, rid: Rid, tuple: Vec<u8>) -> Self {
        Self::new(
            txn_id,
            prev_lsn,
            LogRecordType::Insert,
            LogRecordContent::Tuple { rid, tuple },
        )
    }

    /// One of the three delete flavours: MARKDELETE, APPLYDELETE,
    /// ROLLBACKDELETE.
    pub fn new_delete(
        txn_id: TxnId,
        prev_lsn: Lsn,
        record_type: LogRecordType,
        rid: Rid,
        tuple: Vec<u8>,
    ) -> Self {
        debug_assert!(matches!(
            record_type,
            LogRecordType::MarkDelete | LogRecordType::ApplyDelete | LogRecordType::RollbackDelete
        ));
        Self::new(txn_id, prev_lsn, record_type, LogRecordContent::Tuple { rid, tuple })
    }

    pub fn new_update(
        txn_id: TxnId,
        prev_lsn: Lsn,
        rid: Rid,
        old_tuple: Vec<u8>,
        new_tuple: Vec<u8>,
    ) -> Self {
        Self::new(
            txn_id,
            prev_lsn,
            LogRecordType::Update,
            LogRecordContent::Update {
                rid,
                old_tuple,
                new_tuple,
            },
        )
    }

    pub fn new_new_page(txn_id: TxnId, prev_lsn: Lsn, prev_page_id: PageId, page_id: PageId) -> Self {
        Self::new(
            txn_id,
            prev_lsn,
            LogRecordType::NewPage,
            LogRecordContent::NewPage {
                prev_page_id,
                page_id,
            },
        )
    }

    /// Serialize the record into `buf`, which must hold `self.size` bytes.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<()> {
        let size = self.size as usize;
        if buf.len() < size {
            return Err(LogRecordError::BufferTooSmall(buf.len()));
        }

        LittleEndian::write_u32(&mut buf[0..4], self.size);
        LittleEndian::write_i32(&mut buf[4..8], self.lsn);
        LittleEndian::write_i32(&mut buf[8..12], self.txn_id);
        LittleEndian::write_i32(&mut buf[12..16], self.prev_lsn);
        LittleEndian::write_u32(&mut buf[16..20], self.record_type.to_u32());

        let mut pos = LOG_RECORD_HEADER_SIZE;
        match &self.content {
            LogRecordContent::Transaction => {}
            LogRecordContent::Tuple { rid, tuple } => {
                rid.write_to(&mut buf[pos..pos + RID_SIZE]);
                pos += RID_SIZE;
                write_tuple(buf, &mut pos, tuple);
            }
            LogRecordContent::Update {
                rid,
                old_tuple,
                new_tuple,
            } => {
                rid.write_to(&mut buf[pos..pos + RID_SIZE]);
                pos += RID_SIZE;
                write_tuple(buf, &mut pos, old_tuple);
                write_tuple(buf, &mut pos, new_tuple);
            }
            LogRecordContent::NewPage {
                prev_page_id,
                page_id,
            } => {
                LittleEndian::write_i32(&mut buf[pos..pos + 4], *prev_page_id);
                LittleEndian::write_i32(&mut buf[pos + 4..pos + 8], *page_id);
                pos += 8;
            }
        }
        debug_assert_eq!(pos, size);
        Ok(())
    }

    /// Deserialize one record from the front of `buf`. Returns None if the
    /// buffer starts with a zero size (end of a zero-padded chunk) or does
    /// not hold the whole record.
    pub fn deserialize(buf: &[u8]) -> Option<LogRecord> {
        if buf.len() < LOG_RECORD_HEADER_SIZE {
            return None;
        }
        let size = LittleEndian::read_u32(&buf[0..4]);
        if size == 0 || (size as usize) < LOG_RECORD_HEADER_SIZE || buf.len() < size as usize {
            return None;
        }

        let lsn = LittleEndian::read_i32(&buf[4..8]);
        let txn_id = LittleEndian::read_i32(&buf[8..12]);
        let prev_lsn = LittleEndian::read_i32(&buf[12..16]);
        let record_type = LogRecordType::from_u32(LittleEndian::read_u32(&buf[16..20])).ok()?;

        let mut pos = LOG_RECORD_HEADER_SIZE;
        let content = match record_type {
            LogRecordType::Begin | LogRecordType::Commit | LogRecordType::Abort => {
                LogRecordContent::Transaction
            }
            LogRecordType::Insert
            | LogRecordType::MarkDelete
            | LogRecordType::ApplyDelete
            | LogRecordType::RollbackDelete => {
                let rid = Rid::read_from(&buf[pos..pos + RID_SIZE]);
                pos += RID_SIZE;
                let tuple = read_tuple(buf, &mut pos)?;
                LogRecordContent::Tuple { rid, tuple }
            }
            LogRecordType::Update => {
                let rid = Rid::read_from(&buf[pos..pos + RID_SIZE]);
                pos += RID_SIZE;
                let old_tuple = read_tuple(buf, &mut pos)?;
                let new_tuple = read_tuple(buf, &mut pos)?;
                LogRecordContent::Update {
                    rid,
                    old_tuple,
                    new_tuple,
                }
            }
            LogRecordType::NewPage => {
                let prev_page_id = LittleEndian::read_i32(&buf[pos..pos + 4]);
                let page_id = LittleEndian::read_i32(&buf[pos + 4..pos + 8]);
                LogRecordContent::NewPage {
                    prev_page_id,
                    page_id,
                }
            }
        };

        Some(LogRecord {
            size,
            lsn,
            txn_id,
            prev_lsn,
            record_type,
            content,
        })
    }
}

fn write_tuple(buf: &mut [u8], pos: &mut usize, tuple: &[u8]) {
    LittleEndian::write_u32(&mut buf[*pos..*pos + 4], tuple.len() as u32);
    *pos += 4;
    buf[*pos..*pos + tuple.len()].copy_from_slice(tuple);
    *pos += tuple.len();
}

fn read_tuple(buf: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    if buf.len() < *pos + 4 {
        return None;
    }
    let len = LittleEndian::read_u32(&buf[*pos..*pos + 4]) as usize;
    *pos += 4;
    if buf.len() < *pos + len {
        return None;
    }
    let tuple = buf[*pos..*pos + len].to_vec();
    *pos += len;
    Some(tuple)
}
