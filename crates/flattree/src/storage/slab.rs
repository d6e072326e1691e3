//! Slab allocator for cache-tree node records.
//!
//! Slots are kept in a single `Vec`; freed slots form an intrusive freelist so
//! pruned subtrees hand their slots back to later walks without reallocating.

use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};

use super::index_types::NodeId;

/// Internal entry representation for slab slots.
#[derive(Clone)]
enum Entry<T> {
    /// Slot is free; stores the index of the next free slot in the freelist.
    Vacant(usize),
    Occupied(T),
}

/// Slab of values addressed by stable `NodeId`s.
pub struct Slab<T> {
    entries: Vec<Entry<T>>,

    /// Logical element count (occupied slots only).
    len: usize,

    /// Head of the freelist (index of the next available slot).
    next: usize,
}

impl<T> Slab<T> {
    /// Creates a new empty slab.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
            next: 0,
        }
    }

    /// Inserts a value, returning its stable index.
    pub fn insert(&mut self, value: T) -> NodeId {
        let key = self.next;
        if key == self.entries.len() {
            self.entries.push(Entry::Occupied(value));
            self.next = self.entries.len();
        } else {
            let next_free = match self.entries[key] {
                Entry::Vacant(next) => next,
                Entry::Occupied(_) => unreachable!("slot unexpectedly occupied"),
            };
            self.entries[key] = Entry::Occupied(value);
            self.next = next_free;
        }
        self.len += 1;
        NodeId::new(key)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.entries.get(id.get()) {
            Some(Entry::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.entries.get_mut(id.get()) {
            Some(Entry::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Removes the value at `id` if it exists, returning it.
    pub fn try_remove(&mut self, id: NodeId) -> Option<T> {
        let index = id.get();
        let entry = self.entries.get_mut(index)?;
        if matches!(entry, Entry::Vacant(_)) {
            return None;
        }
        let prev = mem::replace(entry, Entry::Vacant(self.next));
        self.next = index;
        self.len -= 1;
        match prev {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant(_) => None,
        }
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every value and resets the freelist.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
        self.next = 0;
    }

    /// Returns an iterator over occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| match entry {
                Entry::Occupied(value) => Some((NodeId::new(idx), value)),
                Entry::Vacant(_) => None,
            })
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<NodeId> for Slab<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id).expect("invalid slab index")
    }
}

impl<T> IndexMut<NodeId> for Slab<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.get_mut(id).expect("invalid slab index")
    }
}

impl<T> fmt::Debug for Slab<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slab")
            .field("len", &self.len)
            .field("next", &self.next)
            .field("slots", &self.entries.len())
            .finish()
    }
}
