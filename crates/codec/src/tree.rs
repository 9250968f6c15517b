//! The two container kinds of the flattened document and the rules for inserting into them.
//!
//! Responsibilities:
//! - [`PathMap`]: one value per key. A second insert under an existing key is logged and
//!   ignored.
//! - [`MultiMap`]: every key holds a list, and repeated inserts append to it. Siblings that
//!   share an archetype node id accumulate under one key.
//! - Insertion rules shared by both ([`insert`], [`insert_name`], [`compact_entry`]) and the
//!   locatable-attribute fix-up a multi map gets before it is nested.
//!
//! Notes:
//! - Both containers keep insertion order, so output is deterministic for a given tree.

use crate::constants::{
    TAG_ARCHETYPE_DETAILS, TAG_CLASS, TAG_FEEDER_AUDIT, TAG_LINKS, TAG_NAME, TAG_PATH, TAG_UID,
    TAG_VALUE, TYPE_FIELD,
};
use crate::CodecResult;
use openehr::{Pathable, TextValue};
use serde_json::{Map, Value};

/// Container kind, as seen by key computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Unique,
    Multi,
}

/// Operations common to both container kinds.
pub trait Tree {
    fn container(&self) -> Container;

    fn entries(&self) -> &Map<String, Value>;

    fn entries_mut(&mut self) -> &mut Map<String, Value>;

    fn into_map(self) -> Map<String, Value>;

    /// Store `value` under `key` following the container's duplicate-key rule.
    fn put(&mut self, key: String, value: Value);

    fn contains_key(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries_mut().shift_remove(key)
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn into_value(self) -> Value
    where
        Self: Sized,
    {
        Value::Object(self.into_map())
    }
}

/// Unique-key container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathMap(Map<String, Value>);

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl Tree for PathMap {
    fn container(&self) -> Container {
        Container::Unique
    }

    fn entries(&self) -> &Map<String, Value> {
        &self.0
    }

    fn entries_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn put(&mut self, key: String, value: Value) {
        if self.0.contains_key(&key) {
            tracing::warn!(%key, "duplicate key in unique container, keeping the first value");
            return;
        }
        self.0.insert(key, value);
    }
}

impl From<PathMap> for Value {
    fn from(map: PathMap) -> Self {
        map.into_value()
    }
}

/// Multi-valued container: each key maps to a list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiMap(Map<String, Value>);

impl MultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn this multi map into a unique map for nesting.
    ///
    /// Every list stays a list, except the locatable attributes that hold one value
    /// (`/uid`, `/archetype_details`, `/feeder_audit`, `/links`), which are unwrapped to that
    /// value.
    pub fn fix_locatable_attributes(self) -> PathMap {
        let fixed = self
            .0
            .into_iter()
            .map(|(key, value)| match (key.as_str(), value) {
                (
                    TAG_UID | TAG_ARCHETYPE_DETAILS | TAG_FEEDER_AUDIT | TAG_LINKS,
                    Value::Array(mut list),
                ) if !list.is_empty() => {
                    let first = list.swap_remove(0);
                    (key, first)
                }
                (_, value) => (key, value),
            })
            .collect();
        PathMap(fixed)
    }
}

impl Tree for MultiMap {
    fn container(&self) -> Container {
        Container::Multi
    }

    fn entries(&self) -> &Map<String, Value> {
        &self.0
    }

    fn entries_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn put(&mut self, key: String, value: Value) {
        let slot = self
            .0
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(list) => list.push(value),
            other => {
                let previous = std::mem::take(other);
                *other = Value::Array(vec![previous, value]);
            }
        }
    }
}

/// Insert a value under `key`.
///
/// - A null value or an empty object is skipped.
/// - In a unique container owned by `owner`, the owner's name is added once a value lands and
///   no name is present yet.
/// - With `class` given, the class tag is added if the container has none, unless the key is
///   the path or name key.
pub fn insert<T: Tree>(
    tree: &mut T,
    owner: Option<&dyn Pathable>,
    key: String,
    value: Value,
    class: Option<&str>,
) -> CodecResult<()> {
    if is_empty_value(&value) {
        return Ok(());
    }
    let tracks_class = class.is_some() && key != TAG_PATH && key != TAG_NAME;
    tree.put(key, value);

    if let Some(owner) = owner {
        if tree.container() == Container::Unique && !tree.contains_key(TAG_NAME) {
            insert_name(tree, owner.name())?;
        }
    }
    if let (true, Some(class)) = (tracks_class, class) {
        ensure_class(tree, class);
    }
    Ok(())
}

/// Store a node name as a one-element list holding its name map.
pub fn insert_name<T: Tree>(tree: &mut T, name: &TextValue) -> CodecResult<()> {
    let name = name_map(name)?;
    match tree.container() {
        Container::Unique => tree.put(TAG_NAME.to_owned(), Value::Array(vec![name])),
        Container::Multi => tree.put(TAG_NAME.to_owned(), name),
    }
    Ok(())
}

/// The stored form of a name: its value, plus defining code and mappings for coded text.
pub fn name_map(name: &TextValue) -> CodecResult<Value> {
    Ok(strip_type(serde_json::to_value(name)?))
}

/// Insert a child entry, reducing it to its bare value when `/value` is its only key.
///
/// Otherwise the whole entry is nested and `class` is recorded on the container if it has no
/// class tag yet.
pub fn compact_entry<T: Tree>(tree: &mut T, key: String, entry: PathMap, class: &str) -> CodecResult<()> {
    let mut entry = entry.into_map();
    if entry.len() == 1 {
        if let Some(value) = entry.shift_remove(TAG_VALUE) {
            tree.put(key, value);
            return Ok(());
        }
    }
    insert(tree, None, key, Value::Object(entry), Some(class))
}

/// Add the class tag unless one is present.
pub fn ensure_class<T: Tree>(tree: &mut T, class: &str) {
    if !tree.contains_key(TAG_CLASS) {
        tree.put(TAG_CLASS.to_owned(), Value::String(class.to_owned()));
    }
}

/// Replace any class tag with `class`, moving it to the end of the container.
pub fn force_class<T: Tree>(tree: &mut T, class: &str) {
    tree.remove(TAG_CLASS);
    tree.put(TAG_CLASS.to_owned(), Value::String(class.to_owned()));
}

/// Drop the top-level `_type` of a serialised RM object.
pub fn strip_type(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.shift_remove(TYPE_FIELD);
    }
    value
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
