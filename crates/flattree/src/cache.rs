//! Cache tree: walk state keyed by the sequence of keys from the root.
//!
//! Nodes live in a [`Slab`] and are addressed by [`NodeId`]. Each node maps
//! child keys to child ids. Every lookup through [`CacheTree::child`] stamps
//! the child with the current walk generation; [`CacheTree::clean_children`]
//! later drops the children a recomputation did not visit, together with
//! their subtrees. Deletions only ever happen there, never mid-enumeration.

use std::ops::{Index, IndexMut};

use crate::adapter::TreeAdapter;
use crate::storage::{NodeId, NodeState, OptionNodeId, Slab};

pub struct CacheTree<A: TreeAdapter> {
    nodes: Slab<NodeState<A>>,
    root: OptionNodeId,
}

impl<A: TreeAdapter> CacheTree<A> {
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: OptionNodeId::none(),
        }
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root.to_option()
    }

    /// Returns the root slot for `key`, creating it if needed.
    ///
    /// Walking a root under a different key drops the whole previous tree.
    pub fn root_for(&mut self, key: &A::Key, generation: u64) -> NodeId {
        if let Some(root) = self.root() {
            if self.nodes[root].key == *key {
                self.nodes[root].touched = generation;
                return root;
            }
            log::debug!(
                "Root key changed from {:?} to {:?}, dropping {} cached nodes",
                self.nodes[root].key,
                key,
                self.nodes.len()
            );
            self.clear();
        }
        let mut node = NodeState::new(key.clone(), None);
        node.touched = generation;
        let root = self.nodes.insert(node);
        self.root = OptionNodeId::some(root);
        root
    }

    /// Create-or-fetch the child of `parent` under `key`, marking it touched.
    pub fn child(&mut self, parent: NodeId, key: &A::Key, generation: u64) -> NodeId {
        let id = match self.nodes[parent].children.get(key) {
            Some(&id) => id,
            None => self.insert_child(parent, key),
        };
        self.nodes[id].touched = generation;
        id
    }

    /// Create-or-fetch without touching; used to pre-seed expansion state.
    pub(crate) fn child_untouched(&mut self, parent: NodeId, key: &A::Key) -> NodeId {
        match self.nodes[parent].children.get(key) {
            Some(&id) => id,
            None => self.insert_child(parent, key),
        }
    }

    fn insert_child(&mut self, parent: NodeId, key: &A::Key) -> NodeId {
        let id = self.nodes.insert(NodeState::new(key.clone(), Some(parent)));
        self.nodes[parent].children.insert(key.clone(), id);
        id
    }

    /// Read-only child lookup: never creates or touches.
    #[inline]
    pub fn child_only(&self, parent: NodeId, key: &A::Key) -> Option<NodeId> {
        self.nodes.get(parent)?.children.get(key).copied()
    }

    /// Returns true if `id` was touched during walk `generation`.
    #[inline]
    pub fn touched_in(&self, id: NodeId, generation: u64) -> bool {
        self.nodes.get(id).is_some_and(|node| node.touched == generation)
    }

    /// Drops every child of `parent` not touched in `generation`.
    ///
    /// `distinct_touched` is the number of distinct children the caller
    /// touched. The walk never touches a key twice, so when that number equals
    /// the size of the child map every cached child is live and the scan is
    /// skipped. Returns the number of nodes removed, descendants included.
    pub fn clean_children(
        &mut self,
        parent: NodeId,
        generation: u64,
        distinct_touched: usize,
    ) -> usize {
        let Some(node) = self.nodes.get(parent) else {
            return 0;
        };
        if distinct_touched == node.children.len() {
            return 0;
        }

        let stale: Vec<NodeId> = node
            .children
            .values()
            .copied()
            .filter(|&child| !self.touched_in(child, generation))
            .collect();
        stale.into_iter().map(|child| self.remove_subtree(child)).sum()
    }

    /// Removes `id` and all its descendants, detaching it from its parent.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        match node.parent() {
            Some(parent) => {
                let key = node.key.clone();
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.children.remove(&key);
                }
            }
            None => self.root = OptionNodeId::none(),
        }
        self.free_subtree(id)
    }

    fn free_subtree(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(current) {
                stack.extend(node.children.into_values());
                removed += 1;
            }
        }
        removed
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&NodeState<A>> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeState<A>> {
        self.nodes.get_mut(id)
    }

    /// Keys from the root (excluded) down to `id` (included).
    pub fn path_of(&self, id: NodeId) -> Option<Vec<A::Key>> {
        let mut node = self.nodes.get(id)?;
        let mut keys = Vec::new();
        while let Some(parent) = node.parent() {
            keys.push(node.key.clone());
            node = self.nodes.get(parent)?;
        }
        keys.reverse();
        Some(keys)
    }

    /// Follows `path` from the root through cached children.
    pub fn locate(&self, path: &[A::Key]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root()?, |current, key| self.child_only(current, key))
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(id).and_then(NodeState::parent), |&current| {
            self.nodes.get(current).and_then(NodeState::parent)
        })
    }

    /// `id` and every cached descendant, in depth-first order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            result.push(current);
            stack.extend(node.children.values().copied());
        }
        result
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = OptionNodeId::none();
    }
}

impl<A: TreeAdapter> Default for CacheTree<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: TreeAdapter> Index<NodeId> for CacheTree<A> {
    type Output = NodeState<A>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl<A: TreeAdapter> IndexMut<NodeId> for CacheTree<A> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}

impl<A: TreeAdapter> std::fmt::Debug for CacheTree<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTree")
            .field("root", &self.root())
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ObjectAdapter, ObjectKey};

    fn key(name: &str) -> ObjectKey {
        ObjectKey::from(name)
    }

    fn sample() -> (CacheTree<ObjectAdapter>, NodeId, NodeId, NodeId) {
        let mut cache = CacheTree::<ObjectAdapter>::new();
        let root = cache.root_for(&key("root"), 1);
        let a = cache.child(root, &key("a"), 1);
        let a1 = cache.child(a, &key("a1"), 1);
        (cache, root, a, a1)
    }

    #[test]
    fn child_is_create_or_fetch() {
        let (mut cache, root, a, _) = sample();
        assert_eq!(cache.child(root, &key("a"), 2), a);
        assert!(cache.touched_in(a, 2));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache[a].parent(), Some(root));
    }

    #[test]
    fn child_only_does_not_create_or_touch() {
        let (cache, root, a, _) = sample();
        assert_eq!(cache.child_only(root, &key("a")), Some(a));
        assert_eq!(cache.child_only(root, &key("missing")), None);
        assert!(cache.touched_in(a, 1));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn clean_children_drops_untouched_subtrees() {
        let (mut cache, root, a, a1) = sample();
        let b = cache.child(root, &key("b"), 1);

        cache.child(root, &key("b"), 2);
        let removed = cache.clean_children(root, 2, 1);
        assert_eq!(removed, 2);
        assert!(cache.node(a).is_none());
        assert!(cache.node(a1).is_none());
        assert_eq!(cache.child_only(root, &key("a")), None);
        assert_eq!(cache.child_only(root, &key("b")), Some(b));
    }

    #[test]
    fn clean_children_fast_path_when_all_touched() {
        let (mut cache, root, _, _) = sample();
        cache.child(root, &key("a"), 2);
        assert_eq!(cache.clean_children(root, 2, 1), 0);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn clean_children_scans_seeded_entries() {
        let (mut cache, root, a, _) = sample();
        let seeded = cache.child_untouched(root, &key("seeded"));
        cache.child(root, &key("a"), 2);
        assert_eq!(cache.clean_children(root, 2, 1), 1);
        assert!(cache.node(seeded).is_none());
        assert!(cache.node(a).is_some());
    }

    #[test]
    fn root_key_change_drops_tree() {
        let (mut cache, root, _, _) = sample();
        assert_eq!(cache.root_for(&key("root"), 2), root);
        let other = cache.root_for(&key("other"), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.root(), Some(other));
    }

    #[test]
    fn paths_and_ancestors_follow_parent_chain() {
        let (cache, root, a, a1) = sample();
        assert_eq!(cache.path_of(a1), Some(vec![key("a"), key("a1")]));
        assert_eq!(cache.path_of(root), Some(vec![]));
        assert_eq!(cache.locate(&[key("a"), key("a1")]), Some(a1));
        assert_eq!(cache.locate(&[]), Some(root));
        assert_eq!(cache.locate(&[key("a1")]), None);
        assert_eq!(cache.ancestors(a1).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(cache.subtree(a).len(), 2);
    }

    #[test]
    fn remove_subtree_detaches_from_parent() {
        let (mut cache, root, a, _) = sample();
        assert_eq!(cache.remove_subtree(a), 2);
        assert_eq!(cache.child_only(root, &key("a")), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remove_subtree(root), 1);
        assert!(cache.root().is_none());
        assert!(cache.is_empty());
    }
}
