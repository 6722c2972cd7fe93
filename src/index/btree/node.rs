use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{Lsn, PageId, Rid, INVALID_PAGE_ID, PAGE_SIZE, RID_SIZE};
use crate::storage::page::PageData;

/// Fixed width of an index key
pub const KEY_SIZE: usize = 8;

/// Common page header, 8-byte aligned:
/// `page_lsn | page_type | size | max_size | parent_pid | page_id`
pub const NODE_HEADER_SIZE: usize = 24;

/// Leaves extend the header with `next_leaf_pid`
pub const LEAF_HEADER_SIZE: usize = NODE_HEADER_SIZE + 4;

pub const LEAF_ENTRY_SIZE: usize = KEY_SIZE + RID_SIZE;
pub const INTERNAL_ENTRY_SIZE: usize = KEY_SIZE + 4;

const OFF_LSN: usize = 0;
const OFF_TYPE: usize = 4;
const OFF_SIZE: usize = 8;
const OFF_MAX_SIZE: usize = 12;
const OFF_PARENT: usize = 16;
const OFF_PAGE_ID: usize = 20;
const OFF_NEXT_LEAF: usize = 24;

/// Fixed-width index key: an i64 stored little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(i64);

impl IndexKey {
    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn to_i64(self) -> i64 {
        self.0
    }

    fn write_to(self, buf: &mut [u8]) {
        LittleEndian::write_i64(&mut buf[..KEY_SIZE], self.0);
    }

    fn read_from(buf: &[u8]) -> Self {
        Self(LittleEndian::read_i64(&buf[..KEY_SIZE]))
    }
}

impl std::fmt::Display for IndexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Leaf,
    Internal,
}

/// Capacity of a leaf derived from the page size
pub fn default_leaf_max_size() -> i32 {
    ((PAGE_SIZE - NODE_HEADER_SIZE) / LEAF_ENTRY_SIZE) as i32
}

/// Capacity of an internal node derived from the page size
pub fn default_internal_max_size() -> i32 {
    ((PAGE_SIZE - NODE_HEADER_SIZE) / INTERNAL_ENTRY_SIZE) as i32
}

// -- header accessors shared by both node kinds ------------------------------

pub fn node_type(data: &PageData) -> NodeType {
    match LittleEndian::read_u32(&data[OFF_TYPE..OFF_TYPE + 4]) {
        1 => NodeType::Leaf,
        2 => NodeType::Internal,
        other => panic!("invalid index page type {}", other),
    }
}

pub fn is_leaf(data: &PageData) -> bool {
    node_type(data) == NodeType::Leaf
}

pub fn node_lsn(data: &PageData) -> Lsn {
    LittleEndian::read_i32(&data[OFF_LSN..OFF_LSN + 4])
}

pub fn node_size(data: &PageData) -> i32 {
    LittleEndian::read_i32(&data[OFF_SIZE..OFF_SIZE + 4])
}

pub fn node_max_size(data: &PageData) -> i32 {
    LittleEndian::read_i32(&data[OFF_MAX_SIZE..OFF_MAX_SIZE + 4])
}

/// Minimum occupancy of a non-root node: ceil(max_size / 2)
pub fn node_min_size(data: &PageData) -> i32 {
    (node_max_size(data) + 1) / 2
}

pub fn node_parent(data: &PageData) -> PageId {
    LittleEndian::read_i32(&data[OFF_PARENT..OFF_PARENT + 4])
}

pub fn node_page_id(data: &PageData) -> PageId {
    LittleEndian::read_i32(&data[OFF_PAGE_ID..OFF_PAGE_ID + 4])
}

pub fn set_node_size(data: &mut PageData, size: i32) {
    LittleEndian::write_i32(&mut data[OFF_SIZE..OFF_SIZE + 4], size);
}

pub fn set_node_parent(data: &mut PageData, parent: PageId) {
    LittleEndian::write_i32(&mut data[OFF_PARENT..OFF_PARENT + 4], parent);
}

fn init_header(data: &mut PageData, kind: NodeType, page_id: PageId, parent: PageId, max_size: i32) {
    LittleEndian::write_i32(&mut data[OFF_LSN..OFF_LSN + 4], 0);
    let type_tag = match kind {
        NodeType::Leaf => 1,
        NodeType::Internal => 2,
    };
    LittleEndian::write_u32(&mut data[OFF_TYPE..OFF_TYPE + 4], type_tag);
    set_node_size(data, 0);
    LittleEndian::write_i32(&mut data[OFF_MAX_SIZE..OFF_MAX_SIZE + 4], max_size);
    set_node_parent(data, parent);
    LittleEndian::write_i32(&mut data[OFF_PAGE_ID..OFF_PAGE_ID + 4], page_id);
}

// -- leaf pages --------------------------------------------------------------

/// Operations on a leaf page: an ordered `(key, rid)` array after the
/// header, chained to the next leaf. Entry movement is byte-exact
/// (`copy_within` with entry-size arithmetic) so the on-disk layout stays
/// compatible across processes.
pub struct LeafNode;

impl LeafNode {
    pub fn init(data: &mut PageData, page_id: PageId, parent: PageId, max_size: i32) {
        debug_assert!(max_size >= 2);
        debug_assert!(LEAF_HEADER_SIZE + max_size as usize * LEAF_ENTRY_SIZE <= PAGE_SIZE);
        init_header(data, NodeType::Leaf, page_id, parent, max_size);
        Self::set_next_page_id(data, INVALID_PAGE_ID);
    }

    pub fn next_page_id(data: &PageData) -> PageId {
        LittleEndian::read_i32(&data[OFF_NEXT_LEAF..OFF_NEXT_LEAF + 4])
    }

    pub fn set_next_page_id(data: &mut PageData, next: PageId) {
        LittleEndian::write_i32(&mut data[OFF_NEXT_LEAF..OFF_NEXT_LEAF + 4], next);
    }

    fn entry_offset(index: i32) -> usize {
        LEAF_HEADER_SIZE + index as usize * LEAF_ENTRY_SIZE
    }

    pub fn key_at(data: &PageData, index: i32) -> IndexKey {
        debug_assert!(index >= 0 && index < node_size(data));
        IndexKey::read_from(&data[Self::entry_offset(index)..])
    }

    pub fn rid_at(data: &PageData, index: i32) -> Rid {
        debug_assert!(index >= 0 && index < node_size(data));
        Rid::read_from(&data[Self::entry_offset(index) + KEY_SIZE..])
    }

    fn set_entry(data: &mut PageData, index: i32, key: IndexKey, rid: Rid) {
        let off = Self::entry_offset(index);
        key.write_to(&mut data[off..]);
        rid.write_to(&mut data[off + KEY_SIZE..off + KEY_SIZE + RID_SIZE]);
    }

    /// Binary search for `key`. Ok(index) if present, Err(insertion point)
    /// otherwise.
    pub fn search(data: &PageData, key: IndexKey) -> Result<i32, i32> {
        let mut low = 0;
        let mut high = node_size(data) - 1;
        while low <= high {
            let mid = low + (high - low) / 2;
            let probe = Self::key_at(data, mid);
            if key < probe {
                high = mid - 1;
            } else if key > probe {
                low = mid + 1;
            } else {
                return Ok(mid);
            }
        }
        Err(low)
    }

    /// First index whose key is >= `key` (for iterator positioning).
    pub fn key_index(data: &PageData, key: IndexKey) -> i32 {
        match Self::search(data, key) {
            Ok(index) => index,
            Err(index) => index,
        }
    }

    pub fn lookup(data: &PageData, key: IndexKey) -> Option<Rid> {
        Self::search(data, key).ok().map(|i| Self::rid_at(data, i))
    }

    /// Ordered insert. Returns the new size, or None on a duplicate key.
    pub fn insert(data: &mut PageData, key: IndexKey, rid: Rid) -> Option<i32> {
        let size = node_size(data);
        debug_assert!(size < node_max_size(data));
        let index = match Self::search(data, key) {
            Ok(_) => return None,
            Err(index) => index,
        };

        let from = Self::entry_offset(index);
        let to = Self::entry_offset(size);
        if from < to {
            data.copy_within(from..to, from + LEAF_ENTRY_SIZE);
        }
        Self::set_entry(data, index, key, rid);
        set_node_size(data, size + 1);
        Some(size + 1)
    }

    /// Remove `key` if present, keeping entries contiguous. Returns the new
    /// size, or None if the key is absent.
    pub fn remove(data: &mut PageData, key: IndexKey) -> Option<i32> {
        let size = node_size(data);
        let index = Self::search(data, key).ok()?;

        let from = Self::entry_offset(index + 1);
        let to = Self::entry_offset(size);
        if from < to {
            data.copy_within(from..to, Self::entry_offset(index));
        }
        set_node_size(data, size - 1);
        Some(size - 1)
    }

    /// Move the upper half (from `size / 2`) into the empty `recipient`.
    pub fn move_half_to(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        debug_assert!(size > 1);
        debug_assert_eq!(node_size(recipient), 0);
        let mid = size / 2;
        let moved = size - mid;

        let from = Self::entry_offset(mid);
        let to = Self::entry_offset(size);
        recipient[LEAF_HEADER_SIZE..LEAF_HEADER_SIZE + (moved as usize) * LEAF_ENTRY_SIZE]
            .copy_from_slice(&data[from..to]);
        set_node_size(recipient, moved);
        set_node_size(data, mid);
    }

    /// Move every entry into `recipient` (its right end) and hand over the
    /// leaf chain link. Used when the recipient is the left sibling.
    pub fn move_all_to(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        let recipient_size = node_size(recipient);
        debug_assert!(recipient_size + size <= node_max_size(recipient));

        let dst = Self::entry_offset(recipient_size);
        recipient[dst..dst + size as usize * LEAF_ENTRY_SIZE]
            .copy_from_slice(&data[LEAF_HEADER_SIZE..Self::entry_offset(size)]);
        set_node_size(recipient, recipient_size + size);
        Self::set_next_page_id(recipient, Self::next_page_id(data));
        set_node_size(data, 0);
    }

    /// Move the first entry to the end of `recipient` (left neighbour).
    pub fn move_first_to_end_of(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        debug_assert!(size > 0);
        let key = Self::key_at(data, 0);
        let rid = Self::rid_at(data, 0);

        let recipient_size = node_size(recipient);
        Self::set_entry(recipient, recipient_size, key, rid);
        set_node_size(recipient, recipient_size + 1);

        data.copy_within(
            Self::entry_offset(1)..Self::entry_offset(size),
            LEAF_HEADER_SIZE,
        );
        set_node_size(data, size - 1);
    }

    /// Move the last entry to the front of `recipient` (right neighbour).
    pub fn move_last_to_front_of(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        debug_assert!(size > 0);
        let key = Self::key_at(data, size - 1);
        let rid = Self::rid_at(data, size - 1);
        set_node_size(data, size - 1);

        let recipient_size = node_size(recipient);
        recipient.copy_within(
            Self::entry_offset(0)..Self::entry_offset(recipient_size),
            Self::entry_offset(1),
        );
        Self::set_entry(recipient, 0, key, rid);
        set_node_size(recipient, recipient_size + 1);
    }
}

// -- internal pages ----------------------------------------------------------

/// Operations on an internal page: an ordered `(key, child_pid)` array
/// after the header. The key at index 0 is a sentinel and is never
/// compared; the child at index i holds keys in `[keys[i], keys[i+1])`.
pub struct InternalNode;

impl InternalNode {
    pub fn init(data: &mut PageData, page_id: PageId, parent: PageId, max_size: i32) {
        debug_assert!(max_size >= 3);
        debug_assert!(NODE_HEADER_SIZE + max_size as usize * INTERNAL_ENTRY_SIZE <= PAGE_SIZE);
        init_header(data, NodeType::Internal, page_id, parent, max_size);
    }

    fn entry_offset(index: i32) -> usize {
        NODE_HEADER_SIZE + index as usize * INTERNAL_ENTRY_SIZE
    }

    pub fn key_at(data: &PageData, index: i32) -> IndexKey {
        debug_assert!(index >= 0 && index < node_size(data));
        IndexKey::read_from(&data[Self::entry_offset(index)..])
    }

    pub fn set_key_at(data: &mut PageData, index: i32, key: IndexKey) {
        debug_assert!(index >= 0 && index < node_size(data));
        key.write_to(&mut data[Self::entry_offset(index)..]);
    }

    pub fn value_at(data: &PageData, index: i32) -> PageId {
        debug_assert!(index >= 0 && index < node_size(data));
        LittleEndian::read_i32(&data[Self::entry_offset(index) + KEY_SIZE..])
    }

    fn set_value_at(data: &mut PageData, index: i32, value: PageId) {
        LittleEndian::write_i32(
            &mut data[Self::entry_offset(index) + KEY_SIZE..Self::entry_offset(index) + KEY_SIZE + 4],
            value,
        );
    }

    fn set_entry(data: &mut PageData, index: i32, key: IndexKey, value: PageId) {
        key.write_to(&mut data[Self::entry_offset(index)..]);
        Self::set_value_at(data, index, value);
    }

    /// Index of the entry whose child is `value`.
    pub fn value_index(data: &PageData, value: PageId) -> Option<i32> {
        (0..node_size(data)).find(|&i| Self::value_at(data, i) == value)
    }

    /// Child to descend into for `key`: the child of the greatest separator
    /// <= key, searching from index 1 (index 0 is the sentinel).
    pub fn lookup(data: &PageData, key: IndexKey) -> PageId {
        let size = node_size(data);
        debug_assert!(size > 1);
        let mut low = 1;
        let mut high = size - 1;
        while low <= high {
            let mid = low + (high - low) / 2;
            let probe = Self::key_at(data, mid);
            if key < probe {
                high = mid - 1;
            } else if key > probe {
                low = mid + 1;
            } else {
                return Self::value_at(data, mid);
            }
        }
        Self::value_at(data, low - 1)
    }

    /// Fill a brand-new root after the old root split:
    /// `(sentinel, old_child), (key, new_child)`.
    pub fn populate_new_root(
        data: &mut PageData,
        old_child: PageId,
        key: IndexKey,
        new_child: PageId,
    ) {
        debug_assert_eq!(node_size(data), 0);
        set_node_size(data, 2);
        Self::set_entry(data, 0, IndexKey::from_i64(0), old_child);
        Self::set_entry(data, 1, key, new_child);
    }

    /// Insert `(key, new_child)` immediately after the entry whose child is
    /// `old_child`. Returns the new size.
    pub fn insert_node_after(
        data: &mut PageData,
        old_child: PageId,
        key: IndexKey,
        new_child: PageId,
    ) -> i32 {
        let size = node_size(data);
        debug_assert!(size < node_max_size(data));
        let index = Self::value_index(data, old_child).expect("stale child pointer") + 1;

        let from = Self::entry_offset(index);
        let to = Self::entry_offset(size);
        if from < to {
            data.copy_within(from..to, from + INTERNAL_ENTRY_SIZE);
        }
        Self::set_entry(data, index, key, new_child);
        set_node_size(data, size + 1);
        size + 1
    }

    /// Remove the entry at `index`, keeping entries contiguous.
    pub fn remove_at(data: &mut PageData, index: i32) {
        let size = node_size(data);
        debug_assert!(index >= 0 && index < size);
        let from = Self::entry_offset(index + 1);
        let to = Self::entry_offset(size);
        if from < to {
            data.copy_within(from..to, Self::entry_offset(index));
        }
        set_node_size(data, size - 1);
    }

    /// Collapse a one-child root, returning the surviving child.
    pub fn remove_and_return_only_child(data: &mut PageData) -> PageId {
        debug_assert_eq!(node_size(data), 1);
        let child = Self::value_at(data, 0);
        set_node_size(data, 0);
        child
    }

    /// Move the upper half (from `size / 2`) into the empty `recipient`.
    /// The first moved key becomes the recipient's sentinel; the caller
    /// promotes a copy of it into the parent.
    pub fn move_half_to(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        debug_assert!(size > 1);
        debug_assert_eq!(node_size(recipient), 0);
        let mid = size / 2;
        let moved = size - mid;

        let from = Self::entry_offset(mid);
        let to = Self::entry_offset(size);
        recipient[NODE_HEADER_SIZE..NODE_HEADER_SIZE + moved as usize * INTERNAL_ENTRY_SIZE]
            .copy_from_slice(&data[from..to]);
        set_node_size(recipient, moved);
        set_node_size(data, mid);
    }

    /// Move every entry into `recipient` (its right end). The caller must
    /// first write the parent separator into this node's sentinel slot.
    pub fn move_all_to(data: &mut PageData, recipient: &mut PageData) {
        let size = node_size(data);
        let recipient_size = node_size(recipient);
        debug_assert!(recipient_size + size <= node_max_size(recipient));

        let dst = Self::entry_offset(recipient_size);
        recipient[dst..dst + size as usize * INTERNAL_ENTRY_SIZE]
            .copy_from_slice(&data[NODE_HEADER_SIZE..Self::entry_offset(size)]);
        set_node_size(recipient, recipient_size + size);
        set_node_size(data, 0);
    }

    /// Rotate this node's first entry to the end of `recipient` (left
    /// neighbour). The moved entry's key slot receives `separator` (the old
    /// parent key); the new first key, now the sentinel, is returned for
    /// the parent.
    pub fn move_first_to_end_of(
        data: &mut PageData,
        recipient: &mut PageData,
        separator: IndexKey,
    ) -> IndexKey {
        let size = node_size(data);
        debug_assert!(size > 1);
        let child = Self::value_at(data, 0);

        let recipient_size = node_size(recipient);
        Self::set_entry(recipient, recipient_size, separator, child);
        set_node_size(recipient, recipient_size + 1);

        let new_separator = Self::key_at(data, 1);
        data.copy_within(
            Self::entry_offset(1)..Self::entry_offset(size),
            NODE_HEADER_SIZE,
        );
        set_node_size(data, size - 1);
        new_separator
    }

    /// Rotate this node's last entry to the front of `recipient` (right
    /// neighbour). The recipient's old sentinel slot receives `separator`;
    /// the moved key is returned for the parent.
    pub fn move_last_to_front_of(
        data: &mut PageData,
        recipient: &mut PageData,
        separator: IndexKey,
    ) -> IndexKey {
        let size = node_size(data);
        debug_assert!(size > 1);
        let moved_key = Self::key_at(data, size - 1);
        let moved_child = Self::value_at(data, size - 1);
        set_node_size(data, size - 1);

        let recipient_size = node_size(recipient);
        Self::set_key_at(recipient, 0, separator);
        recipient.copy_within(
            Self::entry_offset(0)..Self::entry_offset(recipient_size),
            Self::entry_offset(1),
        );
        Self::set_entry(recipient, 0, moved_key, moved_child);
        set_node_size(recipient, recipient_size + 1);
        moved_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(max_size: i32) -> PageData {
        let mut data = [0u8; PAGE_SIZE];
        LeafNode::init(&mut data, 1, INVALID_PAGE_ID, max_size);
        data
    }

    fn internal(max_size: i32) -> PageData {
        let mut data = [0u8; PAGE_SIZE];
        InternalNode::init(&mut data, 1, INVALID_PAGE_ID, max_size);
        data
    }

    fn key(value: i64) -> IndexKey {
        IndexKey::from_i64(value)
    }

    #[test]
    fn test_default_capacities_fit_page() {
        let leaf_max = default_leaf_max_size() as usize;
        let internal_max = default_internal_max_size() as usize;
        assert!(LEAF_HEADER_SIZE + leaf_max * LEAF_ENTRY_SIZE <= PAGE_SIZE);
        assert!(NODE_HEADER_SIZE + internal_max * INTERNAL_ENTRY_SIZE <= PAGE_SIZE);
    }

    #[test]
    fn test_leaf_ordered_insert() {
        let mut data = leaf(8);
        assert!(LeafNode::insert(&mut data, key(20), Rid::new(0, 20)).is_some());
        assert!(LeafNode::insert(&mut data, key(10), Rid::new(0, 10)).is_some());
        assert!(LeafNode::insert(&mut data, key(30), Rid::new(0, 30)).is_some());

        assert_eq!(node_size(&data), 3);
        assert_eq!(LeafNode::key_at(&data, 0), key(10));
        assert_eq!(LeafNode::key_at(&data, 1), key(20));
        assert_eq!(LeafNode::key_at(&data, 2), key(30));
        assert_eq!(LeafNode::rid_at(&data, 1), Rid::new(0, 20));

        // duplicate rejected
        assert!(LeafNode::insert(&mut data, key(20), Rid::new(0, 99)).is_none());
        assert_eq!(LeafNode::lookup(&data, key(20)), Some(Rid::new(0, 20)));
    }

    #[test]
    fn test_leaf_remove_compacts() {
        let mut data = leaf(8);
        for k in [1i64, 2, 3, 4] {
            LeafNode::insert(&mut data, key(k), Rid::new(0, k as u32));
        }
        assert_eq!(LeafNode::remove(&mut data, key(2)), Some(3));
        assert_eq!(LeafNode::remove(&mut data, key(2)), None);
        assert_eq!(LeafNode::key_at(&data, 0), key(1));
        assert_eq!(LeafNode::key_at(&data, 1), key(3));
        assert_eq!(LeafNode::key_at(&data, 2), key(4));
    }

    #[test]
    fn test_leaf_move_half() {
        let mut left = leaf(8);
        let mut right = leaf(8);
        for k in 0..6i64 {
            LeafNode::insert(&mut left, key(k), Rid::new(0, k as u32));
        }

        LeafNode::move_half_to(&mut left, &mut right);
        assert_eq!(node_size(&left), 3);
        assert_eq!(node_size(&right), 3);
        assert_eq!(LeafNode::key_at(&right, 0), key(3));
        assert_eq!(LeafNode::key_at(&left, 2), key(2));
    }

    #[test]
    fn test_leaf_redistribution_moves() {
        let mut left = leaf(8);
        let mut right = leaf(8);
        for k in 0..3i64 {
            LeafNode::insert(&mut left, key(k), Rid::new(0, k as u32));
        }
        for k in 10..13i64 {
            LeafNode::insert(&mut right, key(k), Rid::new(0, k as u32));
        }

        LeafNode::move_first_to_end_of(&mut right, &mut left);
        assert_eq!(node_size(&left), 4);
        assert_eq!(LeafNode::key_at(&left, 3), key(10));
        assert_eq!(LeafNode::key_at(&right, 0), key(11));

        LeafNode::move_last_to_front_of(&mut left, &mut right);
        assert_eq!(node_size(&left), 3);
        assert_eq!(LeafNode::key_at(&right, 0), key(10));
        assert_eq!(LeafNode::key_at(&right, 1), key(11));
    }

    #[test]
    fn test_internal_lookup_uses_greatest_separator() {
        let mut data = internal(8);
        // children: p10 | 20 p20 | 40 p40
        set_node_size(&mut data, 3);
        InternalNode::set_entry(&mut data, 0, key(0), 10);
        InternalNode::set_entry(&mut data, 1, key(20), 20);
        InternalNode::set_entry(&mut data, 2, key(40), 40);

        assert_eq!(InternalNode::lookup(&data, key(5)), 10);
        assert_eq!(InternalNode::lookup(&data, key(20)), 20);
        assert_eq!(InternalNode::lookup(&data, key(39)), 20);
        assert_eq!(InternalNode::lookup(&data, key(40)), 40);
        assert_eq!(InternalNode::lookup(&data, key(100)), 40);
    }

    #[test]
    fn test_internal_insert_after_child() {
        let mut data = internal(8);
        InternalNode::populate_new_root(&mut data, 10, key(20), 20);
        assert_eq!(node_size(&data), 2);

        let new_size = InternalNode::insert_node_after(&mut data, 10, key(15), 15);
        assert_eq!(new_size, 3);
        assert_eq!(InternalNode::value_at(&data, 0), 10);
        assert_eq!(InternalNode::value_at(&data, 1), 15);
        assert_eq!(InternalNode::value_at(&data, 2), 20);
        assert_eq!(InternalNode::key_at(&data, 1), key(15));
    }

    #[test]
    fn test_internal_rotation() {
        let mut left = internal(8);
        let mut right = internal(8);
        set_node_size(&mut left, 2);
        InternalNode::set_entry(&mut left, 0, key(0), 1);
        InternalNode::set_entry(&mut left, 1, key(10), 2);
        set_node_size(&mut right, 3);
        InternalNode::set_entry(&mut right, 0, key(0), 3);
        InternalNode::set_entry(&mut right, 1, key(30), 4);
        InternalNode::set_entry(&mut right, 2, key(40), 5);

        // borrow right's first child through separator 20
        let new_separator = InternalNode::move_first_to_end_of(&mut right, &mut left, key(20));
        assert_eq!(new_separator, key(30));
        assert_eq!(node_size(&left), 3);
        assert_eq!(InternalNode::key_at(&left, 2), key(20));
        assert_eq!(InternalNode::value_at(&left, 2), 3);
        assert_eq!(node_size(&right), 2);
        assert_eq!(InternalNode::value_at(&right, 0), 4);

        // rotate back: left's last child through separator 30
        let separator = InternalNode::move_last_to_front_of(&mut left, &mut right, key(30));
        assert_eq!(separator, key(20));
        assert_eq!(node_size(&right), 3);
        assert_eq!(InternalNode::value_at(&right, 0), 3);
        assert_eq!(InternalNode::key_at(&right, 1), key(30));
        assert_eq!(InternalNode::value_at(&right, 1), 4);
    }
}
