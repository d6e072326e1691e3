//! The recompute algorithm, written as an explicit stack of cursors.
//!
//! Each expanded node being recomputed owns a [`Cursor`]: the batch of
//! children fetched from the adapter and not visited yet, plus the partial
//! key/offset tables built from the ones already visited. Children are fetched
//! in batches no larger than the remaining budget; a later batch skips the
//! children handed over before. A node's fields are written once its cursor
//! runs dry.
//!
//! When a budget runs out the machine suspends: every cursor lends its partial
//! tables to its node (so readers see a consistent partial view) and takes
//! them back on the next slice. A failed slice lends them for good.

use std::mem;
use std::vec;

use fnv::FnvHashMap;
use thin_vec::{thin_vec, ThinVec};

use crate::adapter::{collect_children_range, Child, NodeValue, TreeAdapter, WalkContext};
use crate::budget::IterationBudget;
use crate::cache::CacheTree;
use crate::error::{display_path, Result, WalkError};
use crate::storage::{NodeFlags, NodeId, NodeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Finished,
    Suspended,
}

/// What a visited child adds to its parent's accumulators.
#[derive(Debug, Clone, Copy)]
struct Contribution {
    count: usize,
    depth: usize,
    can_expand: bool,
}

impl Contribution {
    fn of<A: TreeAdapter>(node: &NodeState<A>) -> Self {
        Self {
            count: node.child_count,
            depth: node.child_depth,
            can_expand: node.child_can_expand(),
        }
    }
}

struct Cursor<A: TreeAdapter> {
    id: NodeId,
    depth: usize,
    pending: vec::IntoIter<Child<A>>,
    /// Children the adapter handed over so far, across batches.
    fetched: usize,
    /// The adapter has nothing left past `fetched`.
    exhausted: bool,
    keys: ThinVec<A::Key>,
    offsets: ThinVec<usize>,
    count: usize,
    child_depth: usize,
    can_expand: bool,
    value: A::Value,
    meta: A::Meta,
    identity: Option<usize>,
    /// Distinct children touched so far.
    distinct: usize,
    /// The node's tables carry an extra entry for the in-progress child.
    extra: bool,
}

impl<A: TreeAdapter> Cursor<A> {
    fn accumulate(&mut self, key: A::Key, child: Contribution) {
        self.keys.push(key);
        self.count += child.count;
        self.offsets.push(self.count);
        self.child_depth = self.child_depth.max(child.depth + 1);
        self.can_expand |= child.can_expand;
    }
}

/// One logical walk of a root, possibly spread over several slices.
pub(crate) struct WalkMachine<A: TreeAdapter> {
    root_key: A::Key,
    root_value: A::Value,
    token: u64,
    expand_depth: usize,
    stamp: u64,
    started: bool,
    slices: usize,
    stack: Vec<Cursor<A>>,
    /// Identities of the values on the cursor stack, with multiplicity.
    active: FnvHashMap<usize, usize>,
    /// Keys from the root (excluded) to the node being visited (included).
    path: Vec<A::Key>,
}

impl<A: TreeAdapter> WalkMachine<A> {
    pub(crate) fn new(
        root_value: A::Value,
        root_key: A::Key,
        token: u64,
        expand_depth: usize,
        stamp: u64,
    ) -> Self {
        Self {
            root_key,
            root_value,
            token,
            expand_depth,
            stamp,
            started: false,
            slices: 0,
            stack: Vec::new(),
            active: FnvHashMap::default(),
            path: Vec::new(),
        }
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    pub(crate) fn slices(&self) -> usize {
        self.slices
    }

    /// Returns true if a call with these arguments continues this walk.
    pub(crate) fn continues(
        &self,
        adapter: &A,
        value: &A::Value,
        key: &A::Key,
        token: u64,
        expand_depth: usize,
    ) -> bool {
        self.root_key == *key
            && self.token == token
            && self.expand_depth == expand_depth
            && !adapter.value_changed(&self.root_value, value)
    }

    /// Runs until the walk completes or `budget` is exhausted.
    pub(crate) fn run(
        &mut self,
        adapter: &A,
        cache: &mut CacheTree<A>,
        config: &A::Config,
        budget: &mut IterationBudget,
    ) -> Result<Progress> {
        let result = self.run_slice(adapter, cache, config, budget);
        match &result {
            Ok(Progress::Finished) => {
                log::debug!(
                    "Walk {} finished: {} nodes visited in slice {}",
                    self.stamp,
                    budget.spent(),
                    self.slices + 1
                );
            }
            Ok(Progress::Suspended) => {
                self.lend_tables(cache, None);
                self.slices += 1;
                log::debug!(
                    "Walk {} suspended after {} nodes ({} open nodes)",
                    self.stamp,
                    budget.spent(),
                    self.stack.len()
                );
            }
            Err(err) => {
                self.abandon(cache);
                log::debug!("Walk {} failed: {}", self.stamp, err);
            }
        }
        result
    }

    fn run_slice(
        &mut self,
        adapter: &A,
        cache: &mut CacheTree<A>,
        config: &A::Config,
        budget: &mut IterationBudget,
    ) -> Result<Progress> {
        if self.started {
            self.reclaim_tables(cache)?;
        } else {
            self.started = true;
            let root = cache.root_for(&self.root_key, self.stamp);
            budget.try_take();
            let meta = adapter.default_meta(&self.root_value, &self.root_key);
            let value = self.root_value.clone();
            if self
                .visit(adapter, cache, config, root, 0, value, meta, 1)?
                .is_some()
            {
                return Ok(Progress::Finished);
            }
        }

        loop {
            let Some(top) = self.stack.last_mut() else {
                return Ok(Progress::Finished);
            };
            if top.pending.as_slice().is_empty() {
                if top.exhausted {
                    self.finish_top(adapter, cache, config);
                } else if budget.is_exhausted() {
                    return Ok(Progress::Suspended);
                } else {
                    self.fetch_children(adapter, cache, config, budget.remaining())?;
                }
                continue;
            }
            if !budget.try_take() {
                return Ok(Progress::Suspended);
            }
            let Some((value, key, meta)) = top.pending.next() else {
                continue;
            };

            let parent = top.id;
            if cache
                .child_only(parent, &key)
                .is_some_and(|id| cache.touched_in(id, self.stamp))
            {
                log::warn!(
                    "Duplicate child key {:?} under {}, skipping",
                    key,
                    display_path(&self.path)
                );
                continue;
            }
            top.distinct += 1;
            let depth = top.depth + 1;
            let position = top.keys.len();

            let id = cache.child(parent, &key, self.stamp);
            self.path.push(key);
            if let Some(contribution) =
                self.visit(adapter, cache, config, id, position, value, meta, depth)?
            {
                self.pop_into_parent(contribution);
            }
        }
    }

    /// Visits one node. Returns its contribution when it is done, or `None`
    /// when a cursor was pushed to enumerate its children.
    #[allow(clippy::too_many_arguments)]
    fn visit(
        &mut self,
        adapter: &A,
        cache: &mut CacheTree<A>,
        config: &A::Config,
        id: NodeId,
        position: usize,
        value: A::Value,
        meta: A::Meta,
        depth: usize,
    ) -> Result<Option<Contribution>> {
        let node = &mut cache[id];
        node.position = position;
        let value = adapter.transform_value(value, &mut node.scratch);
        let identity = value.identity();
        let circular = identity.is_some_and(|identity| self.active.contains_key(&identity));

        let ctx = WalkContext {
            config,
            depth,
            expand_depth: self.expand_depth,
            path: &self.path,
        };
        let has_child = adapter.has_child(&value, &meta, &ctx);
        let default_expand = has_child && adapter.default_expand(&meta, &ctx);
        let node = &cache[id];
        let expanded = has_child && !circular && node.user_expand.unwrap_or(default_expand);

        if !self.should_update(adapter, node, &value, expanded, circular, depth) {
            return Ok(Some(Contribution::of(node)));
        }

        if !expanded {
            let can_expand = has_child && !circular;
            let mut flags = NodeFlags::ITERATE_FINISH;
            flags.set(NodeFlags::HAS_CHILD, has_child);
            flags.set(NodeFlags::CIRCULAR, circular);
            flags.set(NodeFlags::CHILD_CAN_EXPAND, can_expand);

            let node = &mut cache[id];
            let user_collapsed = node.user_expand == Some(false);
            node.value = Some(value);
            node.meta = Some(meta);
            node.flags = flags;
            node.clear_tables();
            self.stamp_node(node);
            // Children of a user-collapsed node stay cached until it is reopened or pruned.
            let removed = if user_collapsed {
                0
            } else {
                cache.clean_children(id, self.stamp, 0)
            };
            log::trace!(
                "Recomputed {} as a single row ({} cached nodes dropped)",
                display_path(&self.path),
                removed
            );
            return Ok(Some(Contribution {
                count: 1,
                depth: 0,
                can_expand,
            }));
        }

        adapter.enter_node(&value, &ctx);

        if let Some(identity) = identity {
            *self.active.entry(identity).or_insert(0) += 1;
        }
        self.stack.push(Cursor {
            id,
            depth,
            pending: Vec::new().into_iter(),
            fetched: 0,
            exhausted: false,
            keys: ThinVec::new(),
            offsets: thin_vec![1],
            count: 1,
            child_depth: 0,
            can_expand: false,
            value,
            meta,
            identity,
            distinct: 0,
            extra: false,
        });
        Ok(None)
    }

    /// Fetches the next batch of at most `limit` children for the top cursor.
    fn fetch_children(
        &mut self,
        adapter: &A,
        cache: &mut CacheTree<A>,
        config: &A::Config,
        limit: usize,
    ) -> Result<()> {
        let Some(top) = self.stack.last_mut() else {
            return Ok(());
        };
        let ctx = WalkContext {
            config,
            depth: top.depth,
            expand_depth: self.expand_depth,
            path: &self.path,
        };
        let scratch = &mut cache[top.id].scratch;
        let (children, exhausted) =
            collect_children_range(adapter, &top.value, &ctx, scratch, top.fetched, limit)
                .map_err(|source| WalkError::Adapter {
                    path: display_path(&self.path),
                    source,
                })?;
        log::trace!(
            "Fetched {} children of {} after {}",
            children.len(),
            display_path(&self.path),
            top.fetched
        );
        top.fetched += children.len();
        top.exhausted = exhausted;
        top.pending = children.into_iter();
        Ok(())
    }

    fn should_update(
        &self,
        adapter: &A,
        node: &NodeState<A>,
        value: &A::Value,
        expanded: bool,
        circular: bool,
        depth: usize,
    ) -> bool {
        let Some(prev) = node.value.as_ref() else {
            return true;
        };
        let flags = node.flags;
        if node.update_stamp == 0
            || flags.contains(NodeFlags::DIRTY)
            || !flags.contains(NodeFlags::ITERATE_FINISH)
            || node.update_token != self.token
            || flags.contains(NodeFlags::EXPANDED) != expanded
            || flags.contains(NodeFlags::CIRCULAR) != circular
            || adapter.value_changed(prev, value)
        {
            return true;
        }
        expanded
            && ((self.expand_depth > node.expanded_depth
                && flags.contains(NodeFlags::CHILD_CAN_EXPAND))
                || (self.expand_depth < node.expanded_depth
                    && depth + node.child_depth > self.expand_depth))
    }

    /// Writes the finished top cursor into its node and hands the result to
    /// the parent cursor.
    fn finish_top(&mut self, adapter: &A, cache: &mut CacheTree<A>, config: &A::Config) {
        let Some(cursor) = self.stack.pop() else {
            return;
        };
        let ctx = WalkContext {
            config,
            depth: cursor.depth,
            expand_depth: self.expand_depth,
            path: &self.path,
        };
        adapter.exit_node(&cursor.value, &ctx);
        if let Some(identity) = cursor.identity {
            if let Some(count) = self.active.get_mut(&identity) {
                *count -= 1;
                if *count == 0 {
                    self.active.remove(&identity);
                }
            }
        }

        let contribution = Contribution {
            count: cursor.count,
            depth: cursor.child_depth,
            can_expand: cursor.can_expand,
        };
        let mut flags = NodeFlags::HAS_CHILD | NodeFlags::EXPANDED | NodeFlags::ITERATE_FINISH;
        flags.set(NodeFlags::CHILD_CAN_EXPAND, cursor.can_expand);

        let node = &mut cache[cursor.id];
        node.value = Some(cursor.value);
        node.meta = Some(cursor.meta);
        node.flags = flags;
        if cursor.keys.is_empty() {
            node.clear_tables();
        } else {
            node.child_keys = cursor.keys;
            node.child_offsets = cursor.offsets;
            node.child_count = cursor.count;
            node.child_depth = cursor.child_depth;
        }
        self.stamp_node(node);
        let removed = cache.clean_children(cursor.id, self.stamp, cursor.distinct);
        log::trace!(
            "Recomputed {}: {} rows, {} cached nodes dropped",
            display_path(&self.path),
            contribution.count,
            removed
        );

        if !self.stack.is_empty() {
            self.pop_into_parent(contribution);
        }
    }

    fn pop_into_parent(&mut self, contribution: Contribution) {
        let Some(key) = self.path.pop() else {
            return;
        };
        if let Some(parent) = self.stack.last_mut() {
            parent.accumulate(key, contribution);
        }
    }

    fn stamp_node(&self, node: &mut NodeState<A>) {
        node.expanded_depth = self.expand_depth;
        node.update_token = self.token;
        node.update_stamp = self.stamp;
    }

    /// Moves every open cursor's partial tables into its node, deepest first,
    /// so each ancestor accounts for the rows of its in-progress child.
    /// `in_progress` is an extra child of the top cursor.
    fn lend_tables(
        &mut self,
        cache: &mut CacheTree<A>,
        mut in_progress: Option<(A::Key, Contribution)>,
    ) {
        for cursor in self.stack.iter_mut().rev() {
            let Some(node) = cache.node_mut(cursor.id) else {
                continue;
            };
            let mut keys = mem::take(&mut cursor.keys);
            let mut offsets = mem::take(&mut cursor.offsets);
            let mut count = cursor.count;
            let mut child_depth = cursor.child_depth;
            let mut can_expand = cursor.can_expand;
            if let Some((key, child)) = in_progress.take() {
                count += child.count;
                keys.push(key);
                offsets.push(count);
                child_depth = child_depth.max(child.depth + 1);
                can_expand |= child.can_expand;
                cursor.extra = true;
            }

            node.value = Some(cursor.value.clone());
            node.meta = Some(cursor.meta.clone());
            node.child_keys = keys;
            node.child_offsets = offsets;
            node.child_count = count;
            node.child_depth = child_depth;
            node.flags = NodeFlags::HAS_CHILD | NodeFlags::EXPANDED | NodeFlags::EARLY_RETURN;
            node.flags.set(NodeFlags::CHILD_CAN_EXPAND, can_expand);

            in_progress = Some((
                node.key.clone(),
                Contribution {
                    count,
                    depth: child_depth,
                    can_expand,
                },
            ));
        }
    }

    /// Leaves the cache consistent after a failed slice.
    ///
    /// The failing node is the top cursor. When none of its children were
    /// visited it keeps its previous state and counts as its parent's
    /// in-progress child. Every other open node gets its partial tables and
    /// stays unfinished, so the next walk recomputes it.
    fn abandon(&mut self, cache: &mut CacheTree<A>) {
        let mut in_progress = None;
        if self.stack.last().is_some_and(|top| top.distinct == 0) {
            if let Some(failed) = self.stack.pop() {
                in_progress = cache
                    .node(failed.id)
                    .filter(|node| node.value.is_some())
                    .map(|node| (node.key.clone(), Contribution::of(node)));
            }
        }
        self.lend_tables(cache, in_progress);
        self.stack.clear();
        self.active.clear();
    }

    /// Takes the tables lent by [`Self::lend_tables`] back into the cursors.
    fn reclaim_tables(&mut self, cache: &mut CacheTree<A>) -> Result<()> {
        for cursor in &mut self.stack {
            let node = cache.node_mut(cursor.id).ok_or_else(|| {
                WalkError::Internal(format!("suspended node {} left the cache", cursor.id))
            })?;
            cursor.keys = mem::take(&mut node.child_keys);
            cursor.offsets = mem::take(&mut node.child_offsets);
            if mem::take(&mut cursor.extra) {
                cursor.keys.pop();
                cursor.offsets.pop();
            }
        }
        log::debug!(
            "Walk {} resumed with {} open nodes",
            self.stamp,
            self.stack.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::adapter::Emit;
    use crate::adapters::{ObjectAdapter, ObjectConfig, ObjectKey, ObjectMeta, ObjectValue};
    use crate::error::AdapterError;

    fn tree() -> ObjectValue {
        ObjectValue::map([
            (
                "A",
                ObjectValue::map([("A1", ObjectValue::from(1.0)), ("A2", ObjectValue::from(2.0))]),
            ),
            ("B", ObjectValue::map([("B1", ObjectValue::from(3.0))])),
        ])
    }

    fn assert_tables_consistent<A: TreeAdapter>(cache: &CacheTree<A>) {
        for id in cache.subtree(cache.root().unwrap()) {
            let node = &cache[id];
            let Some(offsets) = node.child_offsets() else {
                assert!(node.child_keys().is_none());
                continue;
            };
            let keys = node.child_keys().unwrap();
            assert_eq!(offsets.len(), keys.len() + 1);
            assert_eq!(offsets[0], 1);
            assert_eq!(*offsets.last().unwrap(), node.child_count());
            for (i, key) in keys.iter().enumerate() {
                let child = cache.child_only(id, key).unwrap();
                assert_eq!(offsets[i + 1] - offsets[i], cache[child].child_count());
            }
        }
    }

    #[test]
    fn unbounded_run_finishes_in_one_slice() {
        let adapter = ObjectAdapter;
        let config = ObjectConfig::default();
        let mut cache = CacheTree::new();
        let mut machine = WalkMachine::new(tree(), ObjectKey::from("root"), 7, 100, 1);
        let mut budget = IterationBudget::unbounded();
        let progress = machine.run(&adapter, &mut cache, &config, &mut budget).unwrap();
        assert_eq!(progress, Progress::Finished);
        assert_eq!(budget.spent(), 6);
        assert_eq!(machine.slices(), 0);

        let root = &cache[cache.root().unwrap()];
        assert_eq!(root.child_count(), 6);
        assert_eq!(root.child_offsets(), Some(&[1, 4, 6][..]));
        assert_eq!(root.child_depth(), 2);
        assert!(root.iterate_finish());
        assert_tables_consistent(&cache);
    }

    #[test]
    fn suspended_walk_exposes_consistent_partial_tables() {
        let adapter = ObjectAdapter;
        let config = ObjectConfig::default();
        let mut cache = CacheTree::new();
        let mut machine = WalkMachine::new(tree(), ObjectKey::from("root"), 7, 100, 1);

        // root, A, A1
        let mut budget = IterationBudget::new(3);
        let progress = machine.run(&adapter, &mut cache, &config, &mut budget).unwrap();
        assert_eq!(progress, Progress::Suspended);

        let root_id = cache.root().unwrap();
        let root = &cache[root_id];
        assert!(root.early_return());
        assert!(!root.iterate_finish());
        assert_eq!(root.child_count(), 3);
        let a = cache.child_only(root_id, &ObjectKey::from("A")).unwrap();
        assert_eq!(cache[a].child_count(), 2);
        assert_tables_consistent(&cache);

        let mut rest = IterationBudget::unbounded();
        let progress = machine.run(&adapter, &mut cache, &config, &mut rest).unwrap();
        assert_eq!(progress, Progress::Finished);
        assert_eq!(rest.spent(), 3);
        let root = &cache[root_id];
        assert_eq!(root.child_count(), 6);
        assert!(root.iterate_finish());
        assert!(!root.early_return());
        assert_tables_consistent(&cache);
    }

    /// Emits every child twice.
    struct DuplicatingAdapter;

    impl TreeAdapter for DuplicatingAdapter {
        type Value = ObjectValue;
        type Key = ObjectKey;
        type Meta = ObjectMeta;
        type Config = ObjectConfig;
        type Scratch = ();

        fn has_child(
            &self,
            value: &ObjectValue,
            meta: &ObjectMeta,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
        ) -> bool {
            ObjectAdapter.has_child(value, meta, ctx)
        }

        fn iterate_children(
            &self,
            value: &ObjectValue,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
            scratch: &mut (),
            emit: &mut Emit<'_, ObjectValue, ObjectKey, ObjectMeta>,
        ) -> std::result::Result<(), AdapterError> {
            ObjectAdapter.iterate_children(value, ctx, scratch, &mut |value, key, meta| {
                let _ = emit(value.clone(), key.clone(), meta.clone());
                emit(value, key, meta)
            })
        }

        fn default_meta(&self, value: &ObjectValue, key: &ObjectKey) -> ObjectMeta {
            ObjectAdapter.default_meta(value, key)
        }

        fn default_expand(
            &self,
            meta: &ObjectMeta,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
        ) -> bool {
            ObjectAdapter.default_expand(meta, ctx)
        }

        fn config_token(&self, _config: &ObjectConfig) -> u64 {
            0
        }
    }

    /// Object adapter that counts the children it emits.
    #[derive(Default)]
    struct CountingAdapter {
        emitted: Cell<usize>,
    }

    impl TreeAdapter for CountingAdapter {
        type Value = ObjectValue;
        type Key = ObjectKey;
        type Meta = ObjectMeta;
        type Config = ObjectConfig;
        type Scratch = ();

        fn has_child(
            &self,
            value: &ObjectValue,
            meta: &ObjectMeta,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
        ) -> bool {
            ObjectAdapter.has_child(value, meta, ctx)
        }

        fn iterate_children(
            &self,
            value: &ObjectValue,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
            scratch: &mut (),
            emit: &mut Emit<'_, ObjectValue, ObjectKey, ObjectMeta>,
        ) -> std::result::Result<(), AdapterError> {
            ObjectAdapter.iterate_children(value, ctx, scratch, &mut |value, key, meta| {
                self.emitted.set(self.emitted.get() + 1);
                emit(value, key, meta)
            })
        }

        fn default_meta(&self, value: &ObjectValue, key: &ObjectKey) -> ObjectMeta {
            ObjectAdapter.default_meta(value, key)
        }

        fn default_expand(
            &self,
            meta: &ObjectMeta,
            ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
        ) -> bool {
            ObjectAdapter.default_expand(meta, ctx)
        }

        fn config_token(&self, _config: &ObjectConfig) -> u64 {
            0
        }
    }

    #[test]
    fn wide_nodes_are_enumerated_within_the_budget() {
        let value = ObjectValue::list((0..1000).map(|i| ObjectValue::from(i as f64)));
        let adapter = CountingAdapter::default();
        let config = ObjectConfig::default();
        let mut cache = CacheTree::new();
        let mut machine = WalkMachine::new(value, ObjectKey::from("root"), 0, 100, 1);

        // The root alone spends the first slice.
        let progress = machine
            .run(&adapter, &mut cache, &config, &mut IterationBudget::new(1))
            .unwrap();
        assert_eq!(progress, Progress::Suspended);
        assert_eq!(adapter.emitted.get(), 0);
        assert_eq!(cache[cache.root().unwrap()].child_count(), 1);

        let mut visited = 1;
        loop {
            adapter.emitted.set(0);
            let mut budget = IterationBudget::new(10);
            let progress = machine.run(&adapter, &mut cache, &config, &mut budget).unwrap();
            // Only the children handed over before are enumerated again.
            assert!(
                adapter.emitted.get() <= visited + 10,
                "{} emits after {visited} visits",
                adapter.emitted.get()
            );
            visited += budget.spent();
            assert_tables_consistent(&cache);
            if progress == Progress::Finished {
                break;
            }
            assert_eq!(budget.spent(), 10);
        }
        assert_eq!(visited, 1001);
        assert_eq!(cache[cache.root().unwrap()].child_count(), 1001);
    }

    #[test]
    fn duplicate_keys_are_skipped() {
        let value = ObjectValue::list([ObjectValue::from(1.0)]);
        let adapter = DuplicatingAdapter;
        let config = ObjectConfig::default();
        let mut cache = CacheTree::new();
        let mut machine = WalkMachine::new(value, ObjectKey::from("root"), 0, 100, 1);
        machine
            .run(&adapter, &mut cache, &config, &mut IterationBudget::unbounded())
            .unwrap();
        let root = &cache[cache.root().unwrap()];
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.cached_children(), 1);
    }
}
