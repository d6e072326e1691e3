//! Storage layer for the cache tree.
//!
//! - Slab allocator with freelist reuse, addressed by `NodeId`
//! - Node records (`NodeState`) and their packed flags

mod index_types;
mod node;
mod slab;

pub use index_types::{NodeId, OptionNodeId};
pub use node::{NodeFlags, NodeState};
pub use slab::Slab;
