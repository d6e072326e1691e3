//! The public facade: one cache tree, one adapter, one walk at a time.

use crate::adapter::TreeAdapter;
use crate::budget::IterationBudget;
use crate::cache::CacheTree;
use crate::error::{display_path, Result, WalkError};
use crate::resolve::{self, VisibleRows};
use crate::search::{PathSearch, SearchState};
use crate::storage::{NodeFlags, NodeId, NodeState};
use crate::types::{NodeInfo, WalkSummary, WalkerOptions};
use crate::walk::WalkMachine;

/// Flattens values through an adapter and keeps the result cached between
/// walks.
///
/// Walks and mutations take `&mut self`; reads and search steps take
/// `&self`, so a search step can never overlap a walk slice.
pub struct TreeWalker<A: TreeAdapter> {
    pub(crate) adapter: A,
    pub(crate) cache: CacheTree<A>,
    pub(crate) options: WalkerOptions,
    /// Stamp of the most recent logical walk.
    stamp: u64,
    /// Walk suspended by `walk_incremental`.
    pub(crate) pending: Option<WalkMachine<A>>,
}

impl<A: TreeAdapter> TreeWalker<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_options(adapter, WalkerOptions::default())
    }

    pub fn with_options(adapter: A, options: WalkerOptions) -> Self {
        Self {
            adapter,
            cache: CacheTree::new(),
            options,
            stamp: 0,
            pending: None,
        }
    }

    /// Walks `value` in one pass and returns the root summary.
    ///
    /// Nodes whose value, expansion, config and depth are unchanged since the
    /// previous walk keep their state (and stamp) as is.
    pub fn walk(
        &mut self,
        value: A::Value,
        key: A::Key,
        config: &A::Config,
        expand_depth: usize,
    ) -> Result<WalkSummary> {
        self.discard_pending("full walk requested");
        let token = self.adapter.config_token(config);
        let mut machine = self.start_walk(value, key, token, expand_depth);
        let mut budget = IterationBudget::unbounded();
        machine.run(&self.adapter, &mut self.cache, config, &mut budget)?;
        self.summary(true, budget.spent())
    }

    pub(crate) fn start_walk(
        &mut self,
        value: A::Value,
        key: A::Key,
        token: u64,
        expand_depth: usize,
    ) -> WalkMachine<A> {
        self.stamp += 1;
        log::debug!(
            "Starting walk {} of {:?} at depth {}",
            self.stamp,
            key,
            expand_depth
        );
        WalkMachine::new(value, key, token, expand_depth, self.stamp)
    }

    pub(crate) fn summary(&self, finished: bool, visited: usize) -> Result<WalkSummary> {
        let root = self.cache.root().ok_or(WalkError::NotWalked)?;
        let node = &self.cache[root];
        Ok(WalkSummary {
            root,
            row_count: node.child_count(),
            child_depth: node.child_depth(),
            child_can_expand: node.child_can_expand(),
            update_stamp: node.update_stamp(),
            finished,
            visited,
        })
    }

    fn discard_pending(&mut self, reason: &str) {
        if let Some(machine) = self.pending.take() {
            log::debug!(
                "Discarding walk {} after {} slices: {}",
                machine.stamp(),
                machine.slices(),
                reason
            );
        }
    }

    /// Sets the user expansion of the node at `path` to `updater(expanded)`.
    ///
    /// The node and its ancestors are recomputed on the next walk. Returns
    /// the new expansion.
    pub fn set_expand(
        &mut self,
        path: &[A::Key],
        updater: impl FnOnce(bool) -> bool,
    ) -> Result<bool> {
        let id = self.locate(path)?;
        self.discard_pending("expansion changed");
        let node = &mut self.cache[id];
        let expanded = updater(node.is_expanded());
        node.user_expand = Some(expanded);
        self.mark_dirty_upwards(id);
        Ok(expanded)
    }

    /// Forces expansion of the root, every node along `path` and the node
    /// at `path` itself, creating cache entries for segments not visited yet.
    pub fn expand_path(&mut self, path: &[A::Key]) -> Result<()> {
        let mut id = self.cache.root().ok_or(WalkError::NotWalked)?;
        self.discard_pending("path expanded");
        self.cache[id].user_expand = Some(true);
        for key in path {
            id = self.cache.child_untouched(id, key);
            self.cache[id].user_expand = Some(true);
        }
        self.mark_dirty_upwards(id);
        Ok(())
    }

    /// Forces recomputation of the subtree at `path` on the next walk.
    pub fn refresh_path(&mut self, path: &[A::Key]) -> Result<()> {
        let id = self.locate(path)?;
        self.discard_pending("path refreshed");
        for node in self.cache.subtree(id) {
            self.cache[node].flags.insert(NodeFlags::DIRTY);
        }
        self.mark_dirty_upwards(id);
        Ok(())
    }

    fn locate(&self, path: &[A::Key]) -> Result<NodeId> {
        self.cache
            .locate(path)
            .ok_or_else(|| WalkError::UnknownPath {
                path: display_path(path),
            })
    }

    fn mark_dirty_upwards(&mut self, id: NodeId) {
        let chain: Vec<NodeId> = std::iter::once(id).chain(self.cache.ancestors(id)).collect();
        for node in chain {
            self.cache[node].flags.insert(NodeFlags::DIRTY);
        }
    }

    /// Resolves flat row `index` of the current view.
    pub fn node_at(&self, index: usize) -> Result<NodeInfo<'_, A>> {
        resolve::node_at(&self.cache, index, self.options.max_resolve_depth)
    }

    /// Flat row of the node at `path`, if it is visible.
    pub fn index_for_path(&self, path: &[A::Key]) -> Option<usize> {
        resolve::index_for_path(&self.cache, path)
    }

    /// Every visible row, in order.
    pub fn visible_rows(&self) -> VisibleRows<'_, A> {
        VisibleRows::new(&self.cache, self.options.max_resolve_depth)
    }

    /// Starts a depth-first search over the cached view.
    ///
    /// `predicate(value, key, path)` runs once per visited node. An
    /// `iterate_size` of zero uses `options().search_batch`.
    pub fn search_paths<'w, P>(
        &'w self,
        predicate: P,
        config: &'w A::Config,
        iterate_size: usize,
        max_depth: usize,
        full_search: bool,
    ) -> PathSearch<'w, A, P>
    where
        P: FnMut(&A::Value, &A::Key, &[A::Key]) -> bool,
    {
        let state = self.search_state(predicate, iterate_size, max_depth, full_search);
        PathSearch::new(self, config, state)
    }

    /// Like [`Self::search_paths`], but the returned cursor borrows nothing;
    /// drive it with [`SearchState::step`] and resume walks in between.
    pub fn search_state<P>(
        &self,
        predicate: P,
        iterate_size: usize,
        max_depth: usize,
        full_search: bool,
    ) -> SearchState<A, P>
    where
        P: FnMut(&A::Value, &A::Key, &[A::Key]) -> bool,
    {
        let iterate_size = match iterate_size {
            0 => self.options.search_batch,
            size => size,
        };
        SearchState::new(predicate, iterate_size, max_depth, full_search)
    }

    pub fn root(&self) -> Option<&NodeState<A>> {
        self.cache.node(self.cache.root()?)
    }

    /// Visible rows in the current view; zero before the first walk.
    pub fn row_count(&self) -> usize {
        self.root().map_or(0, NodeState::child_count)
    }

    /// Cached state at `path`, without creating or touching anything.
    pub fn state(&self, path: &[A::Key]) -> Option<&NodeState<A>> {
        self.cache.node(self.cache.locate(path)?)
    }

    /// Cached child of `parent` under `key`, without creating or touching it.
    pub fn child_state(&self, parent: NodeId, key: &A::Key) -> Option<&NodeState<A>> {
        self.cache.node(self.cache.child_only(parent, key)?)
    }

    pub fn options(&self) -> &WalkerOptions {
        &self.options
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn cache(&self) -> &CacheTree<A> {
        &self.cache
    }

    /// True while a `walk_incremental` walk is waiting to be resumed.
    pub fn is_suspended(&self) -> bool {
        self.pending.is_some()
    }

    /// Stamp of the most recent walk.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

impl<A: TreeAdapter + std::fmt::Debug> std::fmt::Debug for TreeWalker<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("adapter", &self.adapter)
            .field("cache", &self.cache)
            .field("options", &self.options)
            .field("stamp", &self.stamp)
            .field("suspended", &self.is_suspended())
            .finish()
    }
}
