//! Arena index types for type-safe node addressing.

use std::fmt;

/// A compact 32-bit index into the node arena.
///
/// The u32::MAX value is reserved for `OptionNodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new NodeId from a usize.
    ///
    /// # Panics
    /// Panics if `index >= u32::MAX` (reserved for the None sentinel).
    #[inline]
    pub fn new(index: usize) -> Self {
        assert!(
            index < u32::MAX as usize,
            "node index must be less than u32::MAX"
        );
        Self(index as u32)
    }

    /// Returns the index as a usize.
    #[inline]
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// An optional node index using u32::MAX as the None sentinel.
///
/// Fits in 4 bytes instead of the 8 an `Option<NodeId>` needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct OptionNodeId(u32);

impl OptionNodeId {
    #[inline]
    pub fn none() -> Self {
        Self(u32::MAX)
    }

    #[inline]
    pub fn some(id: NodeId) -> Self {
        Self(id.0)
    }

    #[inline]
    pub fn from_option(id: Option<NodeId>) -> Self {
        id.map_or(Self::none(), Self::some)
    }

    #[inline]
    pub fn to_option(self) -> Option<NodeId> {
        if self.0 == u32::MAX {
            None
        } else {
            Some(NodeId(self.0))
        }
    }
}

impl Default for OptionNodeId {
    fn default() -> Self {
        Self::none()
    }
}
