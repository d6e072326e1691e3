//! Streaming depth-first path search over the cache tree.
//!
//! The search reads cached, expanded subtrees as they are. With `full_search`
//! it also enumerates collapsed nodes the adapter would open by default,
//! straight through the adapter and without creating cache entries. The
//! predicate is the sink: it sees every visited node and records what it
//! wants. The search itself only reports progress at cooperative yields.
//!
//! [`SearchState`] holds the traversal and borrows nothing, so a caller can
//! advance a suspended `walk_incremental` between two steps. A partially
//! walked node is re-read on every step; children the walk has not reached
//! yet are enumerated ad hoc under `full_search` once its cached rows run out.
//! [`PathSearch`] is the borrowing iterator form.

use std::vec;

use fnv::FnvHashSet;

use crate::adapter::{collect_children, Child, NodeValue, TreeAdapter, WalkContext};
use crate::cache::CacheTree;
use crate::error::{display_path, Result, WalkError};
use crate::storage::NodeId;
use crate::types::{SearchYield, YieldReason};
use crate::walker::TreeWalker;

enum Frame<A: TreeAdapter> {
    /// A cached, expanded node; children come from its `child_keys`.
    Cached {
        id: NodeId,
        next: usize,
        depth: usize,
        identity: Option<usize>,
    },
    /// A node enumerated through the adapter for this search only.
    Adhoc {
        children: vec::IntoIter<Child<A>>,
        depth: usize,
        identity: Option<usize>,
    },
}

impl<A: TreeAdapter> Frame<A> {
    fn depth(&self) -> usize {
        match self {
            Self::Cached { depth, .. } | Self::Adhoc { depth, .. } => *depth,
        }
    }

    fn identity(&self) -> Option<usize> {
        match self {
            Self::Cached { identity, .. } | Self::Adhoc { identity, .. } => *identity,
        }
    }
}

/// Where a visited node came from.
enum Source<A: TreeAdapter> {
    Cached(NodeId),
    Adhoc(A::Meta),
}

/// What the top frame asks for next.
enum Next<A: TreeAdapter> {
    Visit(A::Value, A::Key, usize, Source<A>),
    /// Enumerate the children a partial walk has not reached yet.
    Tail(NodeId),
    Skip,
    Pop,
}

/// The borrowed world one search step runs against.
struct View<'a, A: TreeAdapter> {
    adapter: &'a A,
    cache: &'a CacheTree<A>,
    config: &'a A::Config,
}

/// Detached search cursor.
///
/// Created by [`TreeWalker::search_state`]; each [`SearchState::step`] runs
/// until the next yield against the walker it is given. Steps after a walk
/// that dropped a node in the middle of the traversal end that branch.
pub struct SearchState<A: TreeAdapter, P> {
    predicate: P,
    iterate_size: usize,
    max_depth: usize,
    full_search: bool,
    stack: Vec<Frame<A>>,
    /// Frame waiting behind a `PartialSubtree` yield.
    deferred: Option<Frame<A>>,
    path: Vec<A::Key>,
    started: bool,
    done: bool,
    since_yield: usize,
    visited: usize,
    matched: usize,
}

impl<A, P> SearchState<A, P>
where
    A: TreeAdapter,
    P: FnMut(&A::Value, &A::Key, &[A::Key]) -> bool,
{
    pub(crate) fn new(
        predicate: P,
        iterate_size: usize,
        max_depth: usize,
        full_search: bool,
    ) -> Self {
        Self {
            predicate,
            iterate_size: iterate_size.max(1),
            max_depth,
            full_search,
            stack: Vec::new(),
            deferred: None,
            path: Vec::new(),
            started: false,
            done: false,
            since_yield: 0,
            visited: 0,
            matched: 0,
        }
    }

    /// Runs until the next yield. Returns `None` once the search finished or
    /// failed.
    pub fn step(
        &mut self,
        walker: &TreeWalker<A>,
        config: &A::Config,
    ) -> Option<Result<SearchYield>> {
        if self.done {
            return None;
        }
        let view = View {
            adapter: walker.adapter(),
            cache: walker.cache(),
            config,
        };
        match self.advance(&view) {
            Ok(report) => Some(Ok(report)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Progress so far, reported as a yield of `reason`.
    pub fn report(&self, reason: YieldReason) -> SearchYield {
        SearchYield {
            reason,
            visited: self.visited,
            matched: self.matched,
        }
    }

    fn advance(&mut self, view: &View<'_, A>) -> Result<SearchYield> {
        if !self.started {
            self.started = true;
            let root = view.cache.root().ok_or(WalkError::NotWalked)?;
            let node = &view.cache[root];
            let Some(value) = node.value().cloned() else {
                return Ok(self.finish());
            };
            let key = node.key().clone();
            if let Some(reason) = self.visit(view, value, key, 1, Source::Cached(root))? {
                return Ok(self.report(reason));
            }
        }

        loop {
            if let Some(frame) = self.deferred.take() {
                self.stack.push(frame);
            }
            if self.since_yield >= self.iterate_size {
                self.since_yield = 0;
                return Ok(self.report(YieldReason::Budget));
            }

            let full_search = self.full_search;
            let Some(frame) = self.stack.last_mut() else {
                return Ok(self.finish());
            };
            let next = match frame {
                Frame::Cached { id, next, depth, .. } => match view.cache.node(*id) {
                    None => Next::Pop,
                    Some(node) => match node.child_keys().and_then(|keys| keys.get(*next)) {
                        Some(key) => {
                            *next += 1;
                            let child = view.cache.child_only(*id, key).and_then(|child| {
                                Some((child, view.cache[child].value()?.clone()))
                            });
                            match child {
                                Some((child, value)) => Next::Visit(
                                    value,
                                    key.clone(),
                                    *depth + 1,
                                    Source::Cached(child),
                                ),
                                None => Next::Skip,
                            }
                        }
                        None if full_search && !node.iterate_finish() => Next::Tail(*id),
                        None => Next::Pop,
                    },
                },
                Frame::Adhoc {
                    children, depth, ..
                } => match children.next() {
                    Some((value, key, meta)) => {
                        Next::Visit(value, key, *depth + 1, Source::Adhoc(meta))
                    }
                    None => Next::Pop,
                },
            };

            match next {
                Next::Visit(value, key, depth, source) => {
                    if let Some(reason) = self.visit(view, value, key, depth, source)? {
                        return Ok(self.report(reason));
                    }
                }
                Next::Tail(id) => {
                    let children = self.unvisited_children(view, id)?;
                    if let Some(frame) = self.stack.last_mut() {
                        let (depth, identity) = (frame.depth(), frame.identity());
                        *frame = Frame::Adhoc {
                            children: children.into_iter(),
                            depth,
                            identity,
                        };
                    }
                }
                Next::Skip => {}
                Next::Pop => {
                    let frame = self.stack.pop();
                    if frame.is_some_and(|frame| frame.depth() > 1) {
                        self.path.pop();
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> SearchYield {
        self.done = true;
        log::debug!(
            "Path search finished: {} visited, {} matched",
            self.visited,
            self.matched
        );
        self.report(YieldReason::Finished)
    }

    /// Runs the predicate on a node and decides whether to descend. Returns a
    /// yield reason when the descent has to wait for the caller.
    fn visit(
        &mut self,
        view: &View<'_, A>,
        value: A::Value,
        key: A::Key,
        depth: usize,
        source: Source<A>,
    ) -> Result<Option<YieldReason>> {
        if depth > 1 {
            self.path.push(key.clone());
        }
        self.visited += 1;
        self.since_yield += 1;
        if (self.predicate)(&value, &key, &self.path) {
            self.matched += 1;
        }

        let identity = value.identity();
        match source {
            Source::Cached(id) => {
                let node = &view.cache[id];
                let partial = !node.iterate_finish();
                if node.is_expanded() && (node.child_keys().is_some() || partial) {
                    let frame = Frame::Cached {
                        id,
                        next: 0,
                        depth,
                        identity,
                    };
                    if partial {
                        self.deferred = Some(frame);
                        return Ok(Some(YieldReason::PartialSubtree));
                    }
                    self.stack.push(frame);
                    return Ok(None);
                }
                if !node.is_circular() && node.has_child() {
                    if let Some(meta) = node.meta().cloned() {
                        if self.descend_adhoc(view, &value, &meta, depth, identity, false)? {
                            return Ok(None);
                        }
                    }
                }
            }
            Source::Adhoc(meta) => {
                if self.descend_adhoc(view, &value, &meta, depth, identity, true)? {
                    return Ok(None);
                }
            }
        }

        if depth > 1 {
            self.path.pop();
        }
        Ok(None)
    }

    /// Pushes an ad hoc frame when a full search may open this node.
    fn descend_adhoc(
        &mut self,
        view: &View<'_, A>,
        value: &A::Value,
        meta: &A::Meta,
        depth: usize,
        identity: Option<usize>,
        check_children: bool,
    ) -> Result<bool> {
        if !self.full_search || depth >= self.max_depth {
            return Ok(false);
        }
        if identity.is_some() && self.stack.iter().any(|frame| frame.identity() == identity) {
            return Ok(false);
        }

        let ctx = WalkContext {
            config: view.config,
            depth,
            expand_depth: self.max_depth,
            path: &self.path,
        };
        if check_children && !view.adapter.has_child(value, meta, &ctx) {
            return Ok(false);
        }
        if !view.adapter.default_expand(meta, &ctx) {
            return Ok(false);
        }

        let mut scratch = A::Scratch::default();
        let children = collect_children(view.adapter, value, &ctx, &mut scratch).map_err(
            |source| WalkError::Adapter {
                path: display_path(&self.path),
                source,
            },
        )?;
        self.stack.push(Frame::Adhoc {
            children: children.into_iter(),
            depth,
            identity,
        });
        Ok(true)
    }

    /// Children of a partially walked node that are missing from its cached
    /// keys, enumerated through the adapter.
    fn unvisited_children(&self, view: &View<'_, A>, id: NodeId) -> Result<Vec<Child<A>>> {
        let node = &view.cache[id];
        let Some(value) = node.value() else {
            return Ok(Vec::new());
        };
        let depth = self.stack.last().map_or(1, Frame::depth);
        let ctx = WalkContext {
            config: view.config,
            depth,
            expand_depth: self.max_depth,
            path: &self.path,
        };
        let mut scratch = A::Scratch::default();
        let children = collect_children(view.adapter, value, &ctx, &mut scratch).map_err(
            |source| WalkError::Adapter {
                path: display_path(&self.path),
                source,
            },
        )?;
        let seen: FnvHashSet<&A::Key> = node.child_keys().unwrap_or_default().iter().collect();
        log::trace!(
            "Searching {} children of {} the walk has not reached",
            children.len().saturating_sub(seen.len()),
            display_path(&self.path)
        );
        Ok(children
            .into_iter()
            .filter(|(_, key, _)| !seen.contains(key))
            .collect())
    }
}

/// Iterator of cooperative yields produced by [`TreeWalker::search_paths`].
///
/// Each item is a progress report; the last one has
/// [`YieldReason::Finished`]. An adapter error ends the search. To act on a
/// [`YieldReason::PartialSubtree`] yield by resuming the walk, detach the
/// cursor with [`PathSearch::into_state`].
pub struct PathSearch<'w, A: TreeAdapter, P> {
    walker: &'w TreeWalker<A>,
    config: &'w A::Config,
    state: SearchState<A, P>,
}

impl<'w, A, P> PathSearch<'w, A, P>
where
    A: TreeAdapter,
    P: FnMut(&A::Value, &A::Key, &[A::Key]) -> bool,
{
    pub(crate) fn new(
        walker: &'w TreeWalker<A>,
        config: &'w A::Config,
        state: SearchState<A, P>,
    ) -> Self {
        Self {
            walker,
            config,
            state,
        }
    }

    /// Drains the search, returning the final report.
    pub fn run_to_end(mut self) -> Result<SearchYield> {
        let mut last = self.state.report(YieldReason::Finished);
        while let Some(step) = self.next() {
            last = step?;
        }
        Ok(last)
    }

    /// Releases the walker borrow, keeping the traversal.
    pub fn into_state(self) -> SearchState<A, P> {
        self.state
    }
}

impl<A, P> Iterator for PathSearch<'_, A, P>
where
    A: TreeAdapter,
    P: FnMut(&A::Value, &A::Key, &[A::Key]) -> bool,
{
    type Item = Result<SearchYield>;

    fn next(&mut self) -> Option<Self::Item> {
        self.state.step(self.walker, self.config)
    }
}
