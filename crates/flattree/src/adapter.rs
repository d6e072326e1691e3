//! The adapter contract between the walking engine and a value kind.
//!
//! The engine never looks inside a value. Everything it needs to know (does
//! the value have children, what are they, should the node open by default)
//! comes through a [`TreeAdapter`].

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::AdapterError;

/// Identity semantics for values flowing through the engine.
///
/// `same_value` backs the default change detection (a node whose value is
/// the same as last walk is reused as is). `identity` backs circular
/// reference detection: two values with the same identity on one ancestor
/// chain form a cycle. Scalars return `None` and are never circular.
pub trait NodeValue: Clone {
    fn same_value(&self, other: &Self) -> bool;

    fn identity(&self) -> Option<usize> {
        None
    }
}

impl<T: ?Sized> NodeValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(self) as *const () as usize)
    }
}

impl<T: ?Sized> NodeValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }

    fn identity(&self) -> Option<usize> {
        Some(Arc::as_ptr(self) as *const () as usize)
    }
}

/// Per-node view handed to adapter callbacks.
#[derive(Debug)]
pub struct WalkContext<'a, C, K> {
    pub config: &'a C,
    /// Depth of the node, the root being 1.
    pub depth: usize,
    /// Expansion depth requested for this walk.
    pub expand_depth: usize,
    /// Keys from the root (excluded) down to this node (included).
    pub path: &'a [K],
}

/// Sink for children produced by [`TreeAdapter::iterate_children`].
///
/// Returning `ControlFlow::Break` asks the adapter to stop enumerating.
pub type Emit<'e, V, K, M> = dyn FnMut(V, K, M) -> ControlFlow<()> + 'e;

/// Capability set the engine needs from one kind of hierarchical value.
pub trait TreeAdapter {
    type Value: NodeValue;
    type Key: Clone + Eq + Hash + Debug;
    type Meta: Clone + Debug;
    type Config;
    /// Per-node storage that survives across walks (the node's stable ref).
    type Scratch: Default;

    fn has_child(
        &self,
        value: &Self::Value,
        meta: &Self::Meta,
        ctx: &WalkContext<'_, Self::Config, Self::Key>,
    ) -> bool;

    fn iterate_children(
        &self,
        value: &Self::Value,
        ctx: &WalkContext<'_, Self::Config, Self::Key>,
        scratch: &mut Self::Scratch,
        emit: &mut Emit<'_, Self::Value, Self::Key, Self::Meta>,
    ) -> Result<(), AdapterError>;

    /// Metadata for a value that did not come from a parent enumeration (the root).
    fn default_meta(&self, value: &Self::Value, key: &Self::Key) -> Self::Meta;

    fn default_expand(
        &self,
        meta: &Self::Meta,
        ctx: &WalkContext<'_, Self::Config, Self::Key>,
    ) -> bool;

    /// Fingerprint of the config; a new token forces recomputation.
    fn config_token(&self, config: &Self::Config) -> u64;

    fn value_changed(&self, prev: &Self::Value, next: &Self::Value) -> bool {
        !prev.same_value(next)
    }

    /// Canonicalizes a value before it is compared with the cached one.
    fn transform_value(&self, value: Self::Value, _scratch: &mut Self::Scratch) -> Self::Value {
        value
    }

    fn enter_node(&self, _value: &Self::Value, _ctx: &WalkContext<'_, Self::Config, Self::Key>) {}

    fn exit_node(&self, _value: &Self::Value, _ctx: &WalkContext<'_, Self::Config, Self::Key>) {}
}

pub(crate) type Child<A> = (
    <A as TreeAdapter>::Value,
    <A as TreeAdapter>::Key,
    <A as TreeAdapter>::Meta,
);

/// Collects every child an adapter emits, in order.
pub(crate) fn collect_children<A: TreeAdapter>(
    adapter: &A,
    value: &A::Value,
    ctx: &WalkContext<'_, A::Config, A::Key>,
    scratch: &mut A::Scratch,
) -> Result<Vec<Child<A>>, AdapterError> {
    let (children, _) = collect_children_range(adapter, value, ctx, scratch, 0, usize::MAX)?;
    Ok(children)
}

/// Collects at most `limit` children, ignoring the first `skip` emitted.
///
/// Enumeration is stopped through `emit` as soon as `limit` children are
/// held. The flag is true when the adapter ran out of children first.
pub(crate) fn collect_children_range<A: TreeAdapter>(
    adapter: &A,
    value: &A::Value,
    ctx: &WalkContext<'_, A::Config, A::Key>,
    scratch: &mut A::Scratch,
    skip: usize,
    limit: usize,
) -> Result<(Vec<Child<A>>, bool), AdapterError> {
    let limit = limit.max(1);
    let mut children = Vec::new();
    let mut seen = 0;
    adapter.iterate_children(value, ctx, scratch, &mut |value, key, meta| {
        seen += 1;
        if seen <= skip {
            return ControlFlow::Continue(());
        }
        children.push((value, key, meta));
        if children.len() >= limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    let exhausted = children.len() < limit;
    Ok((children, exhausted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_identity_follows_pointer() {
        let a = Rc::new(1);
        let b = a.clone();
        let c = Rc::new(1);
        assert!(a.same_value(&b));
        assert!(!a.same_value(&c));
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    /// Emits `0..len` as `Rc<usize>` children keyed by index.
    struct Counting {
        len: usize,
        emitted: std::cell::Cell<usize>,
    }

    impl TreeAdapter for Counting {
        type Value = Rc<usize>;
        type Key = usize;
        type Meta = ();
        type Config = ();
        type Scratch = ();

        fn has_child(&self, _: &Rc<usize>, _: &(), _: &WalkContext<'_, (), usize>) -> bool {
            self.len > 0
        }

        fn iterate_children(
            &self,
            _value: &Rc<usize>,
            _ctx: &WalkContext<'_, (), usize>,
            _scratch: &mut (),
            emit: &mut Emit<'_, Rc<usize>, usize, ()>,
        ) -> Result<(), AdapterError> {
            for index in 0..self.len {
                self.emitted.set(self.emitted.get() + 1);
                if emit(Rc::new(index), index, ()).is_break() {
                    break;
                }
            }
            Ok(())
        }

        fn default_meta(&self, _: &Rc<usize>, _: &usize) {}

        fn default_expand(&self, _: &(), _: &WalkContext<'_, (), usize>) -> bool {
            true
        }

        fn config_token(&self, _: &()) -> u64 {
            0
        }
    }

    #[test]
    fn ranged_collection_stops_the_adapter() {
        let adapter = Counting {
            len: 10,
            emitted: std::cell::Cell::new(0),
        };
        let ctx = WalkContext {
            config: &(),
            depth: 1,
            expand_depth: 1,
            path: &[],
        };
        let root = Rc::new(0);

        let (children, exhausted) =
            collect_children_range(&adapter, &root, &ctx, &mut (), 0, 3).unwrap();
        assert_eq!(children.iter().map(|c| c.1).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(!exhausted);
        assert_eq!(adapter.emitted.get(), 3);

        adapter.emitted.set(0);
        let (children, exhausted) =
            collect_children_range(&adapter, &root, &ctx, &mut (), 8, 3).unwrap();
        assert_eq!(children.iter().map(|c| c.1).collect::<Vec<_>>(), vec![8, 9]);
        assert!(exhausted);
        assert_eq!(adapter.emitted.get(), 10);

        assert_eq!(collect_children(&adapter, &root, &ctx, &mut ()).unwrap().len(), 10);
    }

    #[test]
    fn arc_identity_follows_pointer() {
        let a: Arc<str> = Arc::from("x");
        let b = a.clone();
        assert!(a.same_value(&b));
        assert_eq!(a.identity(), b.identity());
    }
}
