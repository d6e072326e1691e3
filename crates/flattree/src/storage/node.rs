//! Node records stored in the cache-tree arena.

use std::fmt;

use bitflags::bitflags;
use fnv::FnvHashMap;
use thin_vec::ThinVec;

use super::index_types::{NodeId, OptionNodeId};
use crate::adapter::TreeAdapter;

bitflags! {
    /// Boolean node state packed into one byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The adapter reported children for the value.
        const HAS_CHILD = 1 << 0;
        /// Children are currently part of the flattened view.
        const EXPANDED = 1 << 1;
        /// Some row in the subtree has children that are not expanded.
        const CHILD_CAN_EXPAND = 1 << 2;
        /// The value already appears on the ancestor chain.
        const CIRCULAR = 1 << 3;
        /// Child enumeration completed in the last recomputation.
        const ITERATE_FINISH = 1 << 4;
        /// A time-sliced walk suspended inside this node.
        const EARLY_RETURN = 1 << 5;
        /// Forces recomputation on the next walk.
        const DIRTY = 1 << 6;
    }
}

/// Cached walk state for one path from the root.
pub struct NodeState<A: TreeAdapter> {
    pub(crate) key: A::Key,
    pub(crate) value: Option<A::Value>,
    pub(crate) meta: Option<A::Meta>,
    pub(crate) parent: OptionNodeId,
    /// Index of this node in the parent's `child_keys`.
    pub(crate) position: usize,
    pub(crate) children: FnvHashMap<A::Key, NodeId>,
    pub(crate) child_keys: ThinVec<A::Key>,
    pub(crate) child_offsets: ThinVec<usize>,
    pub(crate) child_count: usize,
    pub(crate) child_depth: usize,
    pub(crate) expanded_depth: usize,
    pub(crate) user_expand: Option<bool>,
    pub(crate) update_token: u64,
    pub(crate) update_stamp: u64,
    /// Walk generation that last touched this node through its parent.
    pub(crate) touched: u64,
    pub(crate) flags: NodeFlags,
    pub(crate) scratch: A::Scratch,
}

impl<A: TreeAdapter> NodeState<A> {
    pub(crate) fn new(key: A::Key, parent: Option<NodeId>) -> Self {
        Self {
            key,
            value: None,
            meta: None,
            parent: OptionNodeId::from_option(parent),
            position: 0,
            children: FnvHashMap::default(),
            child_keys: ThinVec::new(),
            child_offsets: ThinVec::new(),
            child_count: 1,
            child_depth: 0,
            expanded_depth: 0,
            user_expand: None,
            update_token: 0,
            update_stamp: 0,
            touched: 0,
            flags: NodeFlags::empty(),
            scratch: A::Scratch::default(),
        }
    }

    pub fn key(&self) -> &A::Key {
        &self.key
    }

    /// The value as of the last recomputation; `None` until first computed.
    pub fn value(&self) -> Option<&A::Value> {
        self.value.as_ref()
    }

    pub fn meta(&self) -> Option<&A::Meta> {
        self.meta.as_ref()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.to_option()
    }

    /// Keys of the visible children, or `None` when nothing is expanded.
    pub fn child_keys(&self) -> Option<&[A::Key]> {
        (!self.child_keys.is_empty()).then(|| self.child_keys.as_slice())
    }

    /// Prefix sums of visible rows: `[1, 1 + c0, 1 + c0 + c1, ...]`.
    pub fn child_offsets(&self) -> Option<&[usize]> {
        (!self.child_keys.is_empty()).then(|| self.child_offsets.as_slice())
    }

    /// Visible rows in this subtree, the node itself included.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    #[inline]
    pub fn child_depth(&self) -> usize {
        self.child_depth
    }

    pub fn expanded_depth(&self) -> usize {
        self.expanded_depth
    }

    pub fn user_expand(&self) -> Option<bool> {
        self.user_expand
    }

    pub fn update_token(&self) -> u64 {
        self.update_token
    }

    #[inline]
    pub fn update_stamp(&self) -> u64 {
        self.update_stamp
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.flags.contains(NodeFlags::EXPANDED)
    }

    #[inline]
    pub fn has_child(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_CHILD)
    }

    #[inline]
    pub fn is_circular(&self) -> bool {
        self.flags.contains(NodeFlags::CIRCULAR)
    }

    #[inline]
    pub fn child_can_expand(&self) -> bool {
        self.flags.contains(NodeFlags::CHILD_CAN_EXPAND)
    }

    #[inline]
    pub fn iterate_finish(&self) -> bool {
        self.flags.contains(NodeFlags::ITERATE_FINISH)
    }

    #[inline]
    pub fn early_return(&self) -> bool {
        self.flags.contains(NodeFlags::EARLY_RETURN)
    }

    /// Number of cached children, visible or not yet pruned.
    pub fn cached_children(&self) -> usize {
        self.children.len()
    }

    /// Resets the tables to the single-row shape of a collapsed node or leaf.
    pub(crate) fn clear_tables(&mut self) {
        self.child_keys.clear();
        self.child_offsets.clear();
        self.child_count = 1;
        self.child_depth = 0;
    }
}

impl<A: TreeAdapter> fmt::Debug for NodeState<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeState")
            .field("key", &self.key)
            .field("meta", &self.meta)
            .field("parent", &self.parent())
            .field("position", &self.position)
            .field("child_keys", &self.child_keys)
            .field("child_offsets", &self.child_offsets)
            .field("child_count", &self.child_count)
            .field("child_depth", &self.child_depth)
            .field("user_expand", &self.user_expand)
            .field("update_stamp", &self.update_stamp)
            .field("flags", &self.flags)
            .finish()
    }
}
