//! Adapter for plain object graphs.
//!
//! [`ObjectValue`] models dynamically typed data: scalars, lists and ordered
//! maps. Lists and maps are shared (`Rc<RefCell<..>>`), so the same container
//! can appear under several parents or inside itself. Map entries may be
//! hidden; hidden entries are listed only with `show_hidden` and are never
//! opened by default.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::ControlFlow;
use std::rc::Rc;

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::adapter::{Emit, NodeValue, TreeAdapter, WalkContext};
use crate::error::AdapterError;

#[derive(Clone)]
pub enum ObjectValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(Rc<str>),
    List(Rc<RefCell<Vec<ObjectValue>>>),
    Map(Rc<RefCell<Vec<MapEntry>>>),
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: Rc<str>,
    pub value: ObjectValue,
    pub hidden: bool,
}

impl ObjectValue {
    pub fn text(text: &str) -> Self {
        Self::Text(Rc::from(text))
    }

    pub fn list(items: impl IntoIterator<Item = ObjectValue>) -> Self {
        Self::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map<'a>(entries: impl IntoIterator<Item = (&'a str, ObjectValue)>) -> Self {
        Self::Map(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(key, value)| MapEntry {
                    key: Rc::from(key),
                    value,
                    hidden: false,
                })
                .collect(),
        )))
    }

    /// Sets `key` on a map, replacing an existing entry. Returns false for
    /// anything that is not a map.
    pub fn insert(&self, key: &str, value: ObjectValue) -> bool {
        self.set_entry(key, value, false)
    }

    /// Like [`Self::insert`], but the entry is hidden.
    pub fn define_hidden(&self, key: &str, value: ObjectValue) -> bool {
        self.set_entry(key, value, true)
    }

    fn set_entry(&self, key: &str, value: ObjectValue, hidden: bool) -> bool {
        let Self::Map(entries) = self else {
            return false;
        };
        let mut entries = entries.borrow_mut();
        match entries.iter_mut().find(|entry| &*entry.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.hidden = hidden;
            }
            None => entries.push(MapEntry {
                key: Rc::from(key),
                value,
                hidden,
            }),
        }
        true
    }

    /// Removes `key` from a map, returning its value.
    pub fn remove(&self, key: &str) -> Option<ObjectValue> {
        let Self::Map(entries) = self else {
            return None;
        };
        let mut entries = entries.borrow_mut();
        let position = entries.iter().position(|entry| &*entry.key == key)?;
        Some(entries.remove(position).value)
    }

    /// Appends to a list. Returns false for anything that is not a list.
    pub fn push(&self, value: ObjectValue) -> bool {
        let Self::List(items) = self else {
            return false;
        };
        items.borrow_mut().push(value);
        true
    }

    /// Looks up a direct child by key.
    pub fn get(&self, key: &ObjectKey) -> Option<ObjectValue> {
        match (self, key) {
            (Self::List(items), ObjectKey::Index(index)) => items.borrow().get(*index).cloned(),
            (Self::Map(entries), ObjectKey::Field(name)) => entries
                .borrow()
                .iter()
                .find(|entry| entry.key == *name)
                .map(|entry| entry.value.clone()),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }
}

impl From<f64> for ObjectValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ObjectValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ObjectValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl NodeValue for ObjectValue {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn identity(&self) -> Option<usize> {
        match self {
            Self::List(items) => Some(Rc::as_ptr(items) as usize),
            Self::Map(entries) => Some(Rc::as_ptr(entries) as usize),
            _ => None,
        }
    }
}

// Shallow: containers may be cyclic.
impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text:?}"),
            Self::List(items) => match items.try_borrow() {
                Ok(items) => write!(f, "List({})", items.len()),
                Err(_) => f.write_str("List(..)"),
            },
            Self::Map(entries) => match entries.try_borrow() {
                Ok(entries) => write!(f, "Map({})", entries.len()),
                Err(_) => f.write_str("Map(..)"),
            },
        }
    }
}

/// Key of a child: a list index or a map field name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKey {
    Index(usize),
    Field(Rc<str>),
}

impl From<&str> for ObjectKey {
    fn from(name: &str) -> Self {
        Self::Field(Rc::from(name))
    }
}

impl From<usize> for ObjectKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Field(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub enumerable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// List hidden map entries.
    pub show_hidden: bool,
    /// Emit map entries sorted by key instead of insertion order.
    pub sort_keys: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectAdapter;

impl ObjectAdapter {
    fn visible_entries(entries: &[MapEntry], config: &ObjectConfig) -> Vec<MapEntry> {
        let mut visible: Vec<MapEntry> = entries
            .iter()
            .filter(|entry| config.show_hidden || !entry.hidden)
            .cloned()
            .collect();
        if config.sort_keys {
            visible.sort_by(|a, b| a.key.cmp(&b.key));
        }
        visible
    }
}

impl TreeAdapter for ObjectAdapter {
    type Value = ObjectValue;
    type Key = ObjectKey;
    type Meta = ObjectMeta;
    type Config = ObjectConfig;
    type Scratch = ();

    fn has_child(
        &self,
        value: &ObjectValue,
        _meta: &ObjectMeta,
        ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
    ) -> bool {
        match value {
            ObjectValue::List(items) => !items.borrow().is_empty(),
            ObjectValue::Map(entries) => entries
                .borrow()
                .iter()
                .any(|entry| ctx.config.show_hidden || !entry.hidden),
            _ => false,
        }
    }

    fn iterate_children(
        &self,
        value: &ObjectValue,
        ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
        _scratch: &mut (),
        emit: &mut Emit<'_, ObjectValue, ObjectKey, ObjectMeta>,
    ) -> Result<(), AdapterError> {
        match value {
            ObjectValue::List(items) => {
                // Snapshot so `emit` never runs under a borrow.
                let items = items.borrow().clone();
                for (index, item) in items.into_iter().enumerate() {
                    let meta = ObjectMeta { enumerable: true };
                    if emit(item, ObjectKey::Index(index), meta).is_break() {
                        break;
                    }
                }
            }
            ObjectValue::Map(entries) => {
                let entries = Self::visible_entries(&entries.borrow(), ctx.config);
                for entry in entries {
                    let meta = ObjectMeta {
                        enumerable: !entry.hidden,
                    };
                    if emit(entry.value, ObjectKey::Field(entry.key), meta).is_break() {
                        break;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn default_meta(&self, _value: &ObjectValue, _key: &ObjectKey) -> ObjectMeta {
        ObjectMeta { enumerable: true }
    }

    fn default_expand(
        &self,
        meta: &ObjectMeta,
        ctx: &WalkContext<'_, ObjectConfig, ObjectKey>,
    ) -> bool {
        meta.enumerable && ctx.depth <= ctx.expand_depth
    }

    fn config_token(&self, config: &ObjectConfig) -> u64 {
        let mut hasher = FnvHasher::default();
        config.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(config: &ObjectConfig, depth: usize) -> WalkContext<'_, ObjectConfig, ObjectKey> {
        WalkContext {
            config,
            depth,
            expand_depth: 2,
            path: &[],
        }
    }

    fn children(value: &ObjectValue, config: &ObjectConfig) -> Vec<(ObjectKey, ObjectMeta)> {
        let mut out = Vec::new();
        ObjectAdapter
            .iterate_children(value, &ctx(config, 1), &mut (), &mut |_, key, meta| {
                out.push((key, meta));
                ControlFlow::Continue(())
            })
            .unwrap();
        out
    }

    #[test]
    fn map_children_follow_insertion_order() {
        let value = ObjectValue::map([("b", 1.0.into()), ("a", 2.0.into())]);
        let keys: Vec<_> = children(&value, &ObjectConfig::default())
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);

        let sorted = ObjectConfig {
            sort_keys: true,
            ..Default::default()
        };
        let keys: Vec<_> = children(&value, &sorted)
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn hidden_entries_need_show_hidden() {
        let value = ObjectValue::map([("shown", 1.0.into())]);
        value.define_hidden("secret", ObjectValue::map([("x", 1.0.into())]));
        assert_eq!(children(&value, &ObjectConfig::default()).len(), 1);

        let config = ObjectConfig {
            show_hidden: true,
            ..Default::default()
        };
        let all = children(&value, &config);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].0, ObjectKey::from("secret"));
        assert!(!all[1].1.enumerable);
        assert!(!ObjectAdapter.default_expand(&all[1].1, &ctx(&config, 1)));

        let only_hidden = ObjectValue::map([]);
        only_hidden.define_hidden("h", 1.0.into());
        let meta = ObjectMeta { enumerable: true };
        assert!(!ObjectAdapter.has_child(&only_hidden, &meta, &ctx(&ObjectConfig::default(), 1)));
        assert!(ObjectAdapter.has_child(&only_hidden, &meta, &ctx(&config, 1)));
    }

    #[test]
    fn emit_break_stops_enumeration() {
        let value = ObjectValue::list([1.0.into(), 2.0.into(), 3.0.into()]);
        let mut seen = 0;
        ObjectAdapter
            .iterate_children(
                &value,
                &ctx(&ObjectConfig::default(), 1),
                &mut (),
                &mut |_, _, _| {
                    seen += 1;
                    if seen == 2 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn identity_is_shared_for_containers_only() {
        let list = ObjectValue::list([]);
        let alias = list.clone();
        assert!(list.same_value(&alias));
        assert_eq!(list.identity(), alias.identity());
        assert!(!list.same_value(&ObjectValue::list([])));

        let a = ObjectValue::from(1.5);
        assert!(a.same_value(&ObjectValue::from(1.5)));
        assert_eq!(a.identity(), None);
        assert!(ObjectValue::text("x").same_value(&"x".into()));
    }

    #[test]
    fn default_expand_is_depth_limited() {
        let config = ObjectConfig::default();
        let meta = ObjectMeta { enumerable: true };
        assert!(ObjectAdapter.default_expand(&meta, &ctx(&config, 2)));
        assert!(!ObjectAdapter.default_expand(&meta, &ctx(&config, 3)));
    }

    #[test]
    fn config_token_tracks_config() {
        let plain = ObjectConfig::default();
        let hidden = ObjectConfig {
            show_hidden: true,
            ..Default::default()
        };
        assert_eq!(ObjectAdapter.config_token(&plain), ObjectAdapter.config_token(&plain));
        assert_ne!(ObjectAdapter.config_token(&plain), ObjectAdapter.config_token(&hidden));
    }

    #[test]
    fn mutation_helpers() {
        let map = ObjectValue::map([("a", 1.0.into())]);
        assert!(map.insert("a", 2.0.into()));
        assert!(map.insert("b", true.into()));
        assert!(map.get(&ObjectKey::from("a")).unwrap().same_value(&2.0.into()));
        assert!(map.remove("b").is_some());
        assert!(map.get(&ObjectKey::from("b")).is_none());
        assert!(!map.push(ObjectValue::Null));

        let list = ObjectValue::list([]);
        assert!(list.push("x".into()));
        assert!(list.get(&ObjectKey::Index(0)).is_some());
        assert_eq!(format!("{list:?}"), "List(1)");
    }
}
