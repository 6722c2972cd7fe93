use byteorder::{ByteOrder, LittleEndian};

/// Page size in bytes
pub const PAGE_SIZE: usize = 512;

/// Page ID type; negative values are sentinels
pub type PageId = i32;

/// Transaction ID type
pub type TxnId = i32;

/// LSN (Log Sequence Number) type; assigned as byte offsets into the log stream
pub type Lsn = i32;

/// Buffer pool frame ID type
pub type FrameId = usize;

pub const INVALID_PAGE_ID: PageId = -1;
pub const INVALID_TXN_ID: TxnId = -1;
pub const INVALID_LSN: Lsn = -1;

/// Page 0 holds the (index name, root page id) record directory
pub const HEADER_PAGE_ID: PageId = 0;

/// Record ID: the (page, slot) address of a tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

/// Serialized width of a Rid
pub const RID_SIZE: usize = 8;

impl Rid {
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        LittleEndian::write_i32(&mut buf[0..4], self.page_id);
        LittleEndian::write_u32(&mut buf[4..8], self.slot);
    }

    pub fn read_from(buf: &[u8]) -> Self {
        Self {
            page_id: LittleEndian::read_i32(&buf[0..4]),
            slot: LittleEndian::read_u32(&buf[4..8]),
        }
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot)
    }
}
