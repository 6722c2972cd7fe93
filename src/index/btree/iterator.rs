use std::sync::Arc;

use crate::common::types::{Rid, INVALID_PAGE_ID};
use crate::index::btree::error::Result;
use crate::index::btree::node::{node_page_id, node_size, IndexKey, LeafNode};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::PagePtr;

/// Iterator over a leaf chain. Holds a pin (not a latch) on the current
/// leaf; each access takes the leaf's read latch briefly. The pin moves
/// forward with the iterator and is returned on drop.
pub struct TreeIterator {
    buffer_pool: Arc<BufferPoolManager>,
    leaf: Option<PagePtr>,
    index: i32,
}

impl TreeIterator {
    pub(crate) fn new(buffer_pool: Arc<BufferPoolManager>, leaf: PagePtr, index: i32) -> Self {
        Self {
            buffer_pool,
            leaf: Some(leaf),
            index,
        }
    }

    pub(crate) fn empty(buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self {
            buffer_pool,
            leaf: None,
            index: 0,
        }
    }

    /// True when the iterator sits past the last entry of a leaf with no
    /// successor (or the tree was empty).
    pub fn at_end(&self) -> bool {
        match self.leaf.as_ref() {
            None => true,
            Some(page) => {
                let guard = page.read_latch();
                self.index >= node_size(&guard)
                    && LeafNode::next_page_id(&guard) == INVALID_PAGE_ID
            }
        }
    }

    /// The entry under the iterator, if any.
    pub fn current(&self) -> Option<(IndexKey, Rid)> {
        let page = self.leaf.as_ref()?;
        let guard = page.read_latch();
        if self.index < node_size(&guard) {
            Some((
                LeafNode::key_at(&guard, self.index),
                LeafNode::rid_at(&guard, self.index),
            ))
        } else {
            None
        }
    }

    /// Step to the next entry, following the leaf chain.
    pub fn advance(&mut self) -> Result<()> {
        if self.leaf.is_none() {
            return Ok(());
        }
        self.index += 1;
        self.skip_exhausted()
    }

    /// Hop to the next leaf while the index points past the current one.
    pub(crate) fn skip_exhausted(&mut self) -> Result<()> {
        loop {
            let (size, next, current_pid) = match self.leaf.as_ref() {
                None => return Ok(()),
                Some(page) => {
                    let guard = page.read_latch();
                    (
                        node_size(&guard),
                        LeafNode::next_page_id(&guard),
                        node_page_id(&guard),
                    )
                }
            };

            if self.index < size || next == INVALID_PAGE_ID {
                return Ok(());
            }

            let next_page = self.buffer_pool.fetch_page(next)?;
            self.leaf = Some(next_page);
            self.buffer_pool.unpin_page(current_pid, false);
            self.index = 0;
        }
    }
}

impl Iterator for TreeIterator {
    type Item = (IndexKey, Rid);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current()?;
        self.advance().ok()?;
        Some(item)
    }
}

impl Drop for TreeIterator {
    fn drop(&mut self) {
        if let Some(page) = self.leaf.take() {
            self.buffer_pool.unpin_page(page.page_id(), false);
        }
    }
}
