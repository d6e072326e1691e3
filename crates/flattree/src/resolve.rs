//! Flat index resolution over the cached offset tables.
//!
//! A node's `child_offsets` are prefix sums of its children's row counts, so
//! the child holding a relative row is found by binary search and the search
//! continues inside it with the child's base offset subtracted.

use crate::adapter::TreeAdapter;
use crate::cache::CacheTree;
use crate::error::{display_path, Result, WalkError};
use crate::types::NodeInfo;

/// Resolves flat row `index` to its node.
///
/// Stops after `max_depth` levels and returns the deepest node reached, with
/// `truncated` set.
pub fn node_at<A: TreeAdapter>(
    cache: &CacheTree<A>,
    index: usize,
    max_depth: usize,
) -> Result<NodeInfo<'_, A>> {
    let root = cache.root().ok_or(WalkError::NotWalked)?;
    let rows = cache[root].child_count();
    if index >= rows {
        return Err(WalkError::IndexOutOfRange { index, rows });
    }

    let mut id = root;
    let mut remaining = index;
    let mut base = 0;
    let mut depth = 1;
    let mut path = Vec::new();
    let mut parent_indices = Vec::new();
    let mut truncated = false;

    while remaining > 0 {
        if depth >= max_depth {
            log::debug!(
                "Resolve ceiling of {} reached for index {} at {}",
                max_depth,
                index,
                display_path(&path)
            );
            truncated = true;
            break;
        }

        let node = &cache[id];
        let (Some(keys), Some(offsets)) = (node.child_keys(), node.child_offsets()) else {
            return Err(WalkError::MissingOffsets {
                path: display_path(&path),
            });
        };
        let slot = offsets.partition_point(|&offset| offset <= remaining) - 1;
        let key = keys.get(slot).ok_or_else(|| {
            WalkError::Internal(format!(
                "row {} past the last offset of {}",
                remaining,
                display_path(&path)
            ))
        })?;
        let child = cache.child_only(id, key).ok_or_else(|| {
            WalkError::Internal(format!(
                "visible child {:?} of {} is not cached",
                key,
                display_path(&path)
            ))
        })?;

        parent_indices.push(base);
        base += offsets[slot];
        remaining -= offsets[slot];
        path.push(key.clone());
        id = child;
        depth += 1;
    }

    Ok(NodeInfo {
        id,
        index: base,
        depth,
        path,
        parent_indices,
        truncated,
        state: &cache[id],
    })
}

/// Flat index of the node at `path`, or `None` if any segment is not visible.
pub fn index_for_path<A: TreeAdapter>(cache: &CacheTree<A>, path: &[A::Key]) -> Option<usize> {
    let mut id = cache.root()?;
    let mut index = 0;
    for key in path {
        let node = &cache[id];
        let child = cache.child_only(id, key)?;
        let position = cache[child].position;
        if node.child_keys()?.get(position) != Some(key) {
            return None;
        }
        index += node.child_offsets()?.get(position)?;
        id = child;
    }
    Some(index)
}

/// Iterator resolving every visible row in order.
pub struct VisibleRows<'c, A: TreeAdapter> {
    cache: &'c CacheTree<A>,
    next: usize,
    rows: usize,
    max_depth: usize,
}

impl<'c, A: TreeAdapter> VisibleRows<'c, A> {
    pub(crate) fn new(cache: &'c CacheTree<A>, max_depth: usize) -> Self {
        let rows = cache.root().map_or(0, |root| cache[root].child_count());
        Self {
            cache,
            next: 0,
            rows,
            max_depth,
        }
    }
}

impl<'c, A: TreeAdapter> Iterator for VisibleRows<'c, A> {
    type Item = Result<NodeInfo<'c, A>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.rows {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(node_at(self.cache, index, self.max_depth))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rows - self.next;
        (left, Some(left))
    }
}

impl<A: TreeAdapter> ExactSizeIterator for VisibleRows<'_, A> {}
