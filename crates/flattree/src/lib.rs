//! Incremental tree flattening and indexing.
//!
//! This crate renders large hierarchical values as a flat, randomly indexable
//! list of rows without materializing the whole tree:
//! - Pluggable adapters decide what the children of a value are
//! - A cache tree memoizes per-node walk state between walks
//! - Offset tables map flat row indices to nodes by binary search
//! - Budgeted walks spread one traversal over many cooperative slices
//! - Path search streams matches over the cached view
//!
//! ```
//! use flattree::adapters::{ObjectAdapter, ObjectConfig, ObjectKey, ObjectValue};
//! use flattree::TreeWalker;
//!
//! let value = ObjectValue::map([("a", ObjectValue::list([1.0.into(), 2.0.into()]))]);
//! let mut walker = TreeWalker::new(ObjectAdapter);
//! let summary = walker
//!     .walk(value, ObjectKey::from("root"), &ObjectConfig::default(), 100)
//!     .unwrap();
//! assert_eq!(summary.row_count, 4);
//! assert_eq!(walker.node_at(3).unwrap().depth, 3);
//! ```

pub mod adapter;
pub mod adapters;
pub mod budget;
pub mod cache;
pub mod error;
pub mod resolve;
pub mod search;
pub mod storage;
pub mod types;
mod walk;
pub mod walker;

// Re-export main types
pub use adapter::{Emit, NodeValue, TreeAdapter, WalkContext};
pub use budget::IterationBudget;
pub use cache::CacheTree;
pub use error::{AdapterError, Result, WalkError};
pub use resolve::VisibleRows;
pub use search::{PathSearch, SearchState};
pub use storage::{NodeFlags, NodeId, NodeState};
pub use types::{NodeInfo, SearchYield, WalkSummary, WalkerOptions, YieldReason};
pub use walker::TreeWalker;
