use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::common::types::{PageId, Rid, HEADER_PAGE_ID, INVALID_PAGE_ID};
use crate::index::btree::error::{BTreeError, Result};
use crate::index::btree::iterator::TreeIterator;
use crate::index::btree::node::{
    default_internal_max_size, default_leaf_max_size, is_leaf, node_max_size, node_min_size,
    node_page_id, node_parent, node_size, set_node_parent, IndexKey, InternalNode, LeafNode,
};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::{HeaderPage, PageData};
use crate::transaction::concurrency::transaction::{LatchedPage, Transaction};

/// Guard over the tree's root pointer. Holding it is the "structure mutex":
/// it is acquired before the root page is latched and released once the
/// descent proves the operation cannot rewrite the root.
type RootGuard<'a> = MutexGuard<'a, PageId>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteOp {
    Insert,
    Remove,
}

/// Concurrent B+tree over fixed-size keys and record ids, stored in
/// buffer-pool pages.
///
/// Writers descend with write latches under the latch-crabbing discipline:
/// every ancestor latch is released as soon as a child proves safe for the
/// operation, and every latch still held is tracked in the transaction's
/// page set so each exit path releases through one place. Readers crab
/// hand-over-hand with read latches.
///
/// The root page id lives both in memory and in the header page's record
/// for this index; every change goes through `update_root`.
pub struct BPlusTree {
    name: String,
    buffer_pool: Arc<BufferPoolManager>,
    root: Mutex<PageId>,
    leaf_max_size: i32,
    internal_max_size: i32,
}

impl BPlusTree {
    /// Create an empty tree. No pages are allocated until the first insert.
    pub fn new(name: impl Into<String>, buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self::new_with_max_sizes(
            name,
            buffer_pool,
            default_leaf_max_size(),
            default_internal_max_size(),
        )
    }

    /// Create an empty tree with explicit node capacities. Small capacities
    /// let tests exercise splits and merges with few keys.
    pub fn new_with_max_sizes(
        name: impl Into<String>,
        buffer_pool: Arc<BufferPoolManager>,
        leaf_max_size: i32,
        internal_max_size: i32,
    ) -> Self {
        assert!(leaf_max_size >= 2 && internal_max_size >= 3);
        Self {
            name: name.into(),
            buffer_pool,
            root: Mutex::new(INVALID_PAGE_ID),
            leaf_max_size,
            internal_max_size,
        }
    }

    /// Reopen a tree whose root is recorded in the header page.
    pub fn open(name: impl Into<String>, buffer_pool: Arc<BufferPoolManager>) -> Result<Self> {
        let name = name.into();
        let page = buffer_pool.fetch_page(HEADER_PAGE_ID)?;
        let root_pid = {
            let mut guard = page.write_latch();
            let data: &mut PageData = &mut guard;
            HeaderPage::new(data).get_root_id(&name)
        };
        buffer_pool.unpin_page(HEADER_PAGE_ID, false);

        let tree = Self::new(name, buffer_pool);
        *tree.root.lock() = root_pid.unwrap_or(INVALID_PAGE_ID);
        Ok(tree)
    }

    pub fn is_empty(&self) -> bool {
        *self.root.lock() == INVALID_PAGE_ID
    }

    pub fn root_page_id(&self) -> PageId {
        *self.root.lock()
    }

    /// Point lookup. Appends the value to `result` and returns true if the
    /// key exists.
    pub fn get_value(&self, key: IndexKey, result: &mut Vec<Rid>) -> Result<bool> {
        let root_guard = self.root.lock();
        let root_pid = *root_guard;
        if root_pid == INVALID_PAGE_ID {
            return Ok(false);
        }

        let page = self.buffer_pool.fetch_page(root_pid)?;
        let mut guard = page.read_latch();
        drop(page);
        // the root latch is held; the structure mutex can go
        drop(root_guard);

        loop {
            if is_leaf(&guard) {
                let found = LeafNode::lookup(&guard, key);
                let pid = node_page_id(&guard);
                drop(guard);
                self.buffer_pool.unpin_page(pid, false);
                return Ok(match found {
                    Some(rid) => {
                        result.push(rid);
                        true
                    }
                    None => false,
                });
            }

            let child_pid = InternalNode::lookup(&guard, key);
            let child = self.buffer_pool.fetch_page(child_pid)?;
            let child_guard = child.read_latch();
            drop(child);

            let pid = node_page_id(&guard);
            drop(guard);
            self.buffer_pool.unpin_page(pid, false);
            guard = child_guard;
        }
    }

    /// Insert a unique key. Returns false if the key is already present.
    pub fn insert(&self, key: IndexKey, rid: Rid, txn: &Transaction) -> Result<bool> {
        let mut root_guard = Some(self.root.lock());

        if **root_guard.as_ref().unwrap() == INVALID_PAGE_ID {
            self.start_new_tree(key, rid, root_guard.as_mut().unwrap())?;
            return Ok(true);
        }

        self.descend_write(key, WriteOp::Insert, txn, &mut root_guard)?;
        let mut leaf_entry = txn
            .pop_latched_page()
            .expect("write descent leaves the leaf latched");

        let inserted = LeafNode::insert(leaf_entry.write_guard(), key, rid);
        let result = match inserted {
            None => {
                // duplicate key
                self.release_entry(leaf_entry);
                false
            }
            Some(new_size) => {
                leaf_entry.dirty = true;
                if new_size == self.leaf_max_size {
                    self.split_leaf(txn, &mut root_guard, leaf_entry)?;
                } else {
                    self.release_entry(leaf_entry);
                }
                true
            }
        };

        self.release_page_set(txn, &mut root_guard);
        Ok(result)
    }

    /// Remove a key. Removing an absent key is a no-op.
    pub fn remove(&self, key: IndexKey, txn: &Transaction) -> Result<()> {
        let mut root_guard = Some(self.root.lock());
        if **root_guard.as_ref().unwrap() == INVALID_PAGE_ID {
            return Ok(());
        }

        self.descend_write(key, WriteOp::Remove, txn, &mut root_guard)?;
        let mut leaf_entry = txn
            .pop_latched_page()
            .expect("write descent leaves the leaf latched");

        match LeafNode::remove(leaf_entry.write_guard(), key) {
            None => {
                self.release_entry(leaf_entry);
            }
            Some(new_size) => {
                leaf_entry.dirty = true;
                let parent = node_parent(leaf_entry.write_guard());
                let min_size = node_min_size(leaf_entry.write_guard());

                if parent == INVALID_PAGE_ID {
                    if new_size == 0 {
                        // the last key is gone; the tree is empty again
                        let pid = leaf_entry.page.page_id();
                        self.release_entry(leaf_entry);
                        self.buffer_pool.delete_page(pid);
                        let root = root_guard
                            .as_mut()
                            .expect("structure mutex held while emptying the root");
                        **root = INVALID_PAGE_ID;
                        self.update_root(INVALID_PAGE_ID, false)?;
                    } else {
                        self.release_entry(leaf_entry);
                    }
                } else if new_size >= min_size {
                    self.release_entry(leaf_entry);
                } else {
                    self.coalesce_or_redistribute(txn, &mut root_guard, leaf_entry)?;
                }
            }
        }

        self.release_page_set(txn, &mut root_guard);
        Ok(())
    }

    /// Iterator over the whole tree from the leftmost leaf.
    pub fn begin(&self) -> Result<TreeIterator> {
        self.begin_internal(None)
    }

    /// Iterator positioned at the first key >= `key`.
    pub fn begin_at(&self, key: IndexKey) -> Result<TreeIterator> {
        self.begin_internal(Some(key))
    }

    fn begin_internal(&self, key: Option<IndexKey>) -> Result<TreeIterator> {
        let root_guard = self.root.lock();
        let root_pid = *root_guard;
        if root_pid == INVALID_PAGE_ID {
            return Ok(TreeIterator::empty(self.buffer_pool.clone()));
        }

        let mut page = self.buffer_pool.fetch_page(root_pid)?;
        let mut guard = page.read_latch();
        drop(root_guard);

        loop {
            if is_leaf(&guard) {
                let index = match key {
                    Some(key) => LeafNode::key_index(&guard, key),
                    None => 0,
                };
                drop(guard);
                // the leaf stays pinned; the iterator owns the pin now
                let mut iter = TreeIterator::new(self.buffer_pool.clone(), page, index);
                iter.skip_exhausted()?;
                return Ok(iter);
            }

            let child_pid = match key {
                Some(key) => InternalNode::lookup(&guard, key),
                None => InternalNode::value_at(&guard, 0),
            };
            let child = self.buffer_pool.fetch_page(child_pid)?;
            let child_guard = child.read_latch();

            let pid = node_page_id(&guard);
            drop(guard);
            self.buffer_pool.unpin_page(pid, false);
            page = child;
            guard = child_guard;
        }
    }

    // -- write descent -------------------------------------------------------

    /// A node is safe when the operation cannot propagate a structure
    /// change into it: an insert must not make it reach `max_size` (the
    /// split trigger), a remove must leave it at or above its minimum. The
    /// root is exempt from the minimum but unsafe once a remove could
    /// collapse it.
    fn is_node_safe(data: &PageData, op: WriteOp) -> bool {
        let size = node_size(data);
        match op {
            WriteOp::Insert => size < node_max_size(data) - 1,
            WriteOp::Remove => {
                if node_parent(data) == INVALID_PAGE_ID {
                    if is_leaf(data) {
                        size > 1
                    } else {
                        size > 2
                    }
                } else {
                    size > node_min_size(data)
                }
            }
        }
    }

    /// Descend to the leaf for `key` with write latches, pushing every
    /// latched page into the transaction's page set and releasing ancestors
    /// (and the structure mutex) as soon as a child proves safe.
    fn descend_write<'a>(
        &'a self,
        key: IndexKey,
        op: WriteOp,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'a>>,
    ) -> Result<()> {
        let mut page_id = **root_guard.as_ref().unwrap();

        loop {
            let page = self.buffer_pool.fetch_page(page_id)?;
            let guard = page.write_latch();
            let leaf = is_leaf(&guard);
            let safe = Self::is_node_safe(&guard, op);
            let child_pid = if leaf {
                INVALID_PAGE_ID
            } else {
                InternalNode::lookup(&guard, key)
            };
            txn.push_latched_page(LatchedPage::write(page, guard));

            if safe {
                self.release_ancestors(txn, root_guard);
            }
            if leaf {
                return Ok(());
            }
            page_id = child_pid;
        }
    }

    /// Release everything in the page set except the most recent entry,
    /// along with the structure mutex.
    fn release_ancestors(&self, txn: &Transaction, root_guard: &mut Option<RootGuard<'_>>) {
        loop {
            let entry = {
                let mut set = txn.page_set();
                if set.len() <= 1 {
                    break;
                }
                set.pop_front().unwrap()
            };
            self.release_entry(entry);
        }
        *root_guard = None;
    }

    /// Release every entry still in the page set and the structure mutex.
    fn release_page_set(&self, txn: &Transaction, root_guard: &mut Option<RootGuard<'_>>) {
        loop {
            let entry = txn.page_set().pop_front();
            match entry {
                Some(entry) => self.release_entry(entry),
                None => break,
            }
        }
        *root_guard = None;
    }

    /// Unlatch and unpin one held page, honouring its dirty flag.
    fn release_entry(&self, entry: LatchedPage) {
        let pid = entry.page.page_id();
        let dirty = entry.dirty;
        drop(entry);
        self.buffer_pool.unpin_page(pid, dirty);
    }

    // -- insert path ---------------------------------------------------------

    fn start_new_tree(&self, key: IndexKey, rid: Rid, root_guard: &mut RootGuard<'_>) -> Result<()> {
        let (page, page_id) = self.buffer_pool.new_page()?;
        {
            let mut data = page.write_latch();
            LeafNode::init(&mut data, page_id, INVALID_PAGE_ID, self.leaf_max_size);
            LeafNode::insert(&mut data, key, rid);
        }
        self.buffer_pool.unpin_page(page_id, true);

        **root_guard = page_id;
        self.update_root(page_id, true)
    }

    /// Split a full leaf: allocate a sibling, move the upper half there,
    /// relink the leaf chain, and propagate the sibling's first key.
    fn split_leaf(
        &self,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'_>>,
        mut leaf_entry: LatchedPage,
    ) -> Result<()> {
        let (sibling_page, sibling_pid) = self.buffer_pool.new_page()?;
        let mut sibling_guard = sibling_page.write_latch();

        {
            let leaf_data: &mut PageData = leaf_entry.write_guard();
            LeafNode::init(
                &mut sibling_guard,
                sibling_pid,
                node_parent(leaf_data),
                self.leaf_max_size,
            );
            LeafNode::move_half_to(leaf_data, &mut sibling_guard);
            LeafNode::set_next_page_id(&mut sibling_guard, LeafNode::next_page_id(leaf_data));
            LeafNode::set_next_page_id(leaf_data, sibling_pid);
        }

        let risen_key = LeafNode::key_at(&sibling_guard, 0);
        let mut sibling_entry = LatchedPage::write(sibling_page, sibling_guard);
        sibling_entry.dirty = true;

        self.insert_into_parent(txn, root_guard, leaf_entry, risen_key, sibling_entry)
    }

    /// Wire a freshly split `right` sibling into the parent of `left`,
    /// growing a new root or splitting the parent recursively as needed.
    /// Consumes (releases) both entries.
    fn insert_into_parent(
        &self,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'_>>,
        mut left: LatchedPage,
        risen_key: IndexKey,
        mut right: LatchedPage,
    ) -> Result<()> {
        let left_pid = left.page.page_id();
        let right_pid = right.page.page_id();
        let parent_pid = node_parent(left.write_guard());

        if parent_pid == INVALID_PAGE_ID {
            // the old root split: grow a new root above it
            let (root_page, root_pid) = self.buffer_pool.new_page()?;
            {
                let mut root_data = root_page.write_latch();
                InternalNode::init(
                    &mut root_data,
                    root_pid,
                    INVALID_PAGE_ID,
                    self.internal_max_size,
                );
                InternalNode::populate_new_root(&mut root_data, left_pid, risen_key, right_pid);
            }
            self.buffer_pool.unpin_page(root_pid, true);

            set_node_parent(left.write_guard(), root_pid);
            set_node_parent(right.write_guard(), root_pid);
            self.release_entry(left);
            self.release_entry(right);

            let root = root_guard
                .as_mut()
                .expect("structure mutex held across a root split");
            **root = root_pid;
            return self.update_root(root_pid, false);
        }

        let mut parent_entry = txn
            .pop_latched_page()
            .expect("parent latch retained below an unsafe child");
        debug_assert_eq!(parent_entry.page.page_id(), parent_pid);

        let new_size =
            InternalNode::insert_node_after(parent_entry.write_guard(), left_pid, risen_key, right_pid);
        parent_entry.dirty = true;
        self.release_entry(left);
        self.release_entry(right);

        if new_size == self.internal_max_size {
            self.split_internal(txn, root_guard, parent_entry)?;
        } else {
            self.release_entry(parent_entry);
        }
        Ok(())
    }

    /// Split a full internal node and recurse into its parent.
    fn split_internal(
        &self,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'_>>,
        mut node_entry: LatchedPage,
    ) -> Result<()> {
        let (sibling_page, sibling_pid) = self.buffer_pool.new_page()?;
        let mut sibling_guard = sibling_page.write_latch();

        {
            let node_data: &mut PageData = node_entry.write_guard();
            InternalNode::init(
                &mut sibling_guard,
                sibling_pid,
                node_parent(node_data),
                self.internal_max_size,
            );
            InternalNode::move_half_to(node_data, &mut sibling_guard);
        }
        self.reparent_children(&sibling_guard, sibling_pid)?;

        // the sibling's first key is promoted; its slot becomes the sentinel
        let risen_key = InternalNode::key_at(&sibling_guard, 0);
        let mut sibling_entry = LatchedPage::write(sibling_page, sibling_guard);
        sibling_entry.dirty = true;

        self.insert_into_parent(txn, root_guard, node_entry, risen_key, sibling_entry)
    }

    /// Point every child referenced by `data` at `new_parent`.
    fn reparent_children(&self, data: &PageData, new_parent: PageId) -> Result<()> {
        for i in 0..node_size(data) {
            self.reparent_child(InternalNode::value_at(data, i), new_parent)?;
        }
        Ok(())
    }

    fn reparent_child(&self, child_pid: PageId, new_parent: PageId) -> Result<()> {
        let page = self.buffer_pool.fetch_page(child_pid)?;
        {
            let mut data = page.write_latch();
            set_node_parent(&mut data, new_parent);
        }
        self.buffer_pool.unpin_page(child_pid, true);
        Ok(())
    }

    // -- remove path ---------------------------------------------------------

    /// Rebalance an underflowing node against an adjacent sibling under the
    /// same (still latched) parent: merge when both fit in one node,
    /// otherwise borrow one entry. Walks up when the merge leaves the
    /// parent under its minimum. Consumes (releases) `node_entry`.
    fn coalesce_or_redistribute(
        &self,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'_>>,
        mut node_entry: LatchedPage,
    ) -> Result<()> {
        let node_pid = node_entry.page.page_id();
        let mut parent_entry = txn
            .pop_latched_page()
            .expect("parent latch retained below an unsafe child");

        let (index, sibling_pid, sibling_on_right) = {
            let parent_data: &PageData = parent_entry.write_guard();
            let index =
                InternalNode::value_index(parent_data, node_pid).expect("child not in its parent");
            // prefer the right sibling unless this is the last child
            let (sibling_index, on_right) = if index == node_size(parent_data) - 1 {
                (index - 1, false)
            } else {
                (index + 1, true)
            };
            (index, InternalNode::value_at(parent_data, sibling_index), on_right)
        };

        let sibling_page = self.buffer_pool.fetch_page(sibling_pid)?;
        let sibling_guard = sibling_page.write_latch();
        let mut sibling_entry = LatchedPage::write(sibling_page, sibling_guard);

        let merged = {
            let node_len = node_size(node_entry.write_guard());
            let sibling_len = node_size(sibling_entry.write_guard());
            let max = node_max_size(node_entry.write_guard());
            node_len + sibling_len <= max - 1
        };

        if merged {
            self.coalesce(
                txn,
                root_guard,
                node_entry,
                sibling_entry,
                parent_entry,
                index,
                sibling_on_right,
            )
        } else {
            self.redistribute(
                node_entry,
                &mut sibling_entry,
                &mut parent_entry,
                index,
                sibling_on_right,
            )?;
            self.release_entry(sibling_entry);
            self.release_entry(parent_entry);
            Ok(())
        }
    }

    /// Merge two siblings into one page, drop the vacated child from the
    /// parent, and delete the emptied page. Recurses into the parent when
    /// the removal leaves it underfull; collapses the root when it is down
    /// to a single child.
    #[allow(clippy::too_many_arguments)]
    fn coalesce(
        &self,
        txn: &Transaction,
        root_guard: &mut Option<RootGuard<'_>>,
        node_entry: LatchedPage,
        sibling_entry: LatchedPage,
        mut parent_entry: LatchedPage,
        index: i32,
        sibling_on_right: bool,
    ) -> Result<()> {
        // orient the merge: the donor empties into the recipient on its left
        let (mut donor, mut recipient, donor_index) = if sibling_on_right {
            (sibling_entry, node_entry, index + 1)
        } else {
            (node_entry, sibling_entry, index)
        };

        let leaf = is_leaf(donor.write_guard());
        if leaf {
            LeafNode::move_all_to(donor.write_guard(), recipient.write_guard());
        } else {
            // the parent separator becomes the sentinel key of the moved run
            let separator = InternalNode::key_at(parent_entry.write_guard(), donor_index);
            InternalNode::set_key_at(donor.write_guard(), 0, separator);
            self.reparent_children(donor.write_guard(), recipient.page.page_id())?;
            InternalNode::move_all_to(donor.write_guard(), recipient.write_guard());
        }
        donor.dirty = true;
        recipient.dirty = true;

        InternalNode::remove_at(parent_entry.write_guard(), donor_index);
        parent_entry.dirty = true;

        let donor_pid = donor.page.page_id();
        self.release_entry(donor);
        self.buffer_pool.delete_page(donor_pid);
        self.release_entry(recipient);

        // the parent lost an entry; rebalance or collapse it
        let parent_is_root = node_parent(parent_entry.write_guard()) == INVALID_PAGE_ID;
        let parent_len = node_size(parent_entry.write_guard());
        let parent_min = node_min_size(parent_entry.write_guard());

        if parent_is_root {
            if parent_len == 1 {
                self.collapse_root(root_guard, parent_entry)?;
            } else {
                self.release_entry(parent_entry);
            }
        } else if parent_len < parent_min {
            self.coalesce_or_redistribute(txn, root_guard, parent_entry)?;
        } else {
            self.release_entry(parent_entry);
        }
        Ok(())
    }

    /// The root is an internal node with a single child: that child becomes
    /// the new root.
    fn collapse_root(
        &self,
        root_guard: &mut Option<RootGuard<'_>>,
        mut old_root: LatchedPage,
    ) -> Result<()> {
        let survivor = InternalNode::remove_and_return_only_child(old_root.write_guard());
        old_root.dirty = true;

        self.reparent_child(survivor, INVALID_PAGE_ID)?;

        let old_root_pid = old_root.page.page_id();
        self.release_entry(old_root);
        self.buffer_pool.delete_page(old_root_pid);

        let root = root_guard
            .as_mut()
            .expect("structure mutex held across a root collapse");
        **root = survivor;
        self.update_root(survivor, false)
    }

    /// Borrow one entry from the sibling: its first entry when it sits on
    /// the right, its last when it sits on the left. The parent separator
    /// is updated to the new boundary key (rotated through, for internal
    /// nodes).
    fn redistribute(
        &self,
        mut node_entry: LatchedPage,
        sibling_entry: &mut LatchedPage,
        parent_entry: &mut LatchedPage,
        index: i32,
        sibling_on_right: bool,
    ) -> Result<()> {
        let node_pid = node_entry.page.page_id();
        let leaf = is_leaf(node_entry.write_guard());

        if sibling_on_right {
            let separator_index = index + 1;
            if leaf {
                LeafNode::move_first_to_end_of(sibling_entry.write_guard(), node_entry.write_guard());
                let boundary = LeafNode::key_at(sibling_entry.write_guard(), 0);
                InternalNode::set_key_at(parent_entry.write_guard(), separator_index, boundary);
            } else {
                let separator =
                    InternalNode::key_at(parent_entry.write_guard(), separator_index);
                let moved_child = InternalNode::value_at(sibling_entry.write_guard(), 0);
                let new_separator = InternalNode::move_first_to_end_of(
                    sibling_entry.write_guard(),
                    node_entry.write_guard(),
                    separator,
                );
                InternalNode::set_key_at(parent_entry.write_guard(), separator_index, new_separator);
                self.reparent_child(moved_child, node_pid)?;
            }
        } else if leaf {
            LeafNode::move_last_to_front_of(sibling_entry.write_guard(), node_entry.write_guard());
            let boundary = LeafNode::key_at(node_entry.write_guard(), 0);
            InternalNode::set_key_at(parent_entry.write_guard(), index, boundary);
        } else {
            let separator = InternalNode::key_at(parent_entry.write_guard(), index);
            let sibling_len = node_size(sibling_entry.write_guard());
            let moved_child = InternalNode::value_at(sibling_entry.write_guard(), sibling_len - 1);
            let new_separator = InternalNode::move_last_to_front_of(
                sibling_entry.write_guard(),
                node_entry.write_guard(),
                separator,
            );
            InternalNode::set_key_at(parent_entry.write_guard(), index, new_separator);
            self.reparent_child(moved_child, node_pid)?;
        }

        node_entry.dirty = true;
        sibling_entry.dirty = true;
        parent_entry.dirty = true;
        self.release_entry(node_entry);
        Ok(())
    }

    // -- root bookkeeping ----------------------------------------------------

    /// Persist the root page id in the header page record for this index.
    /// With `insert_record` a new record is created; otherwise the existing
    /// one is updated (falling back to the other operation keeps a
    /// re-created index consistent).
    fn update_root(&self, root_pid: PageId, insert_record: bool) -> Result<()> {
        let page = self.buffer_pool.fetch_page(HEADER_PAGE_ID)?;
        let ok = {
            let mut guard = page.write_latch();
            let data: &mut PageData = &mut guard;
            let mut header = HeaderPage::new(data);
            if insert_record {
                header.insert_record(&self.name, root_pid) || header.update_record(&self.name, root_pid)
            } else {
                header.update_record(&self.name, root_pid) || header.insert_record(&self.name, root_pid)
            }
        };
        self.buffer_pool.unpin_page(HEADER_PAGE_ID, true);
        if !ok {
            return Err(BTreeError::HeaderPageFull);
        }
        Ok(())
    }
}
