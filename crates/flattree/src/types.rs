//! Result and option types shared by the walker, resolver and search.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapter::TreeAdapter;
use crate::storage::{NodeId, NodeState};

/// Walker-wide tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerOptions {
    /// Maximum number of hops `node_at` descends before giving up.
    pub max_resolve_depth: usize,
    /// Nodes visited per slice by `drive`.
    pub default_budget: usize,
    /// Nodes visited between search yields when the caller passes zero.
    pub search_batch: usize,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: 100,
            default_budget: 1024,
            search_batch: 256,
        }
    }
}

impl WalkerOptions {
    pub fn with_max_resolve_depth(mut self, depth: usize) -> Self {
        self.max_resolve_depth = depth.max(1);
        self
    }

    pub fn with_default_budget(mut self, budget: usize) -> Self {
        self.default_budget = budget.max(1);
        self
    }

    pub fn with_search_batch(mut self, batch: usize) -> Self {
        self.search_batch = batch.max(1);
        self
    }
}

/// Outcome of one walk or walk slice, read off the root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    #[serde(skip)]
    pub root: NodeId,
    /// Visible rows, root included. Partial while `finished` is false.
    pub row_count: usize,
    pub child_depth: usize,
    pub child_can_expand: bool,
    pub update_stamp: u64,
    /// True once the root's enumeration completed.
    pub finished: bool,
    /// Nodes visited during this call.
    pub visited: usize,
}

/// A resolved row of the flattened view.
pub struct NodeInfo<'c, A: TreeAdapter> {
    pub id: NodeId,
    /// Flat index of the returned node.
    pub index: usize,
    /// Depth of the node, the root being 1.
    pub depth: usize,
    /// Keys from the root (excluded) down to the node (included).
    pub path: Vec<A::Key>,
    /// Flat indices of the ancestors, root first.
    pub parent_indices: Vec<usize>,
    /// Set when resolution stopped at the depth ceiling before reaching the
    /// requested index.
    pub truncated: bool,
    pub state: &'c NodeState<A>,
}

impl<A: TreeAdapter> fmt::Debug for NodeInfo<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInfo")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("depth", &self.depth)
            .field("path", &self.path)
            .field("parent_indices", &self.parent_indices)
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// Why a path search handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldReason {
    /// `iterate_size` nodes were visited since the last yield.
    Budget,
    /// The next subtree is only partially walked.
    PartialSubtree,
    /// Traversal is complete.
    Finished,
}

/// Progress report produced at each search yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchYield {
    pub reason: YieldReason,
    /// Nodes visited so far.
    pub visited: usize,
    /// Nodes accepted by the predicate so far.
    pub matched: usize,
}
