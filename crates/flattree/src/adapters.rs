//! Ready-made adapters.

pub mod object;

pub use object::{MapEntry, ObjectAdapter, ObjectConfig, ObjectKey, ObjectMeta, ObjectValue};
