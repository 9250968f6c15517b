//! Flattened document to canonical JSON.
//!
//! Responsibilities:
//! - Rebuild the canonical openEHR JSON of a stored document: arrays, `_type` discriminators
//!   and nesting that the flattening folded into keys.
//! - Classify every sub-map by [`shape::classify`] and emit it accordingly.
//!
//! Notes:
//! - Only documents produced in the path walker mode can be decoded.
//! - Stored documents are untrusted input; nesting is bounded by the configured depth.

mod name;
mod shape;

use crate::config::CodecConfig;
use crate::constants::{
    ARCHETYPE_NODE_ID_FIELD, EPOCH_OFFSET_FIELD, ITEMS_FIELD, ITEM_FIELD,
    MULTIMEDIA_DATA_FIELD, ROWS_FIELD, STRUCTURAL_CLASSES, TAG_ACTIVITIES, TAG_ARCHETYPE_DETAILS,
    TAG_ARCHETYPE_NODE_ID, TAG_CLASS, TAG_COMPOSITION, TAG_CONTENT, TAG_EVENTS, TAG_FEEDER_AUDIT,
    TAG_ITEMS, TAG_LINKS, TAG_NAME, TAG_ORIGIN, TAG_PATH, TAG_TIME, TAG_TIMING, TAG_UID, TAG_VALUE,
    TYPE_FIELD,
};
use crate::path::{attribute, json_key, last_node_id, node_id};
use crate::{CodecError, CodecResult};
use name::name_object;
use openehr::Composition;
use serde_json::{Map, Value};
use shape::{classify, is_member_of, Shape};
use vpr_types::case::camel_to_upper_snake;

const ELEMENT_TYPE: &str = "ELEMENT";
const COMPOSITION_TYPE: &str = "COMPOSITION";
const ITEM_SINGLE_TYPE: &str = "ITEM_SINGLE";
const ITEM_TABLE_TYPE: &str = "ITEM_TABLE";

/// Attributes holding ordered collections of archetyped nodes.
const COLLECTION_ATTRIBUTES: &[&str] = &[TAG_ITEMS, TAG_CONTENT, TAG_EVENTS, TAG_ACTIVITIES];

/// Keys allowed next to the content batches of a composition.
const LOCATABLE_KEYS: &[&str] = &[
    TAG_NAME,
    TAG_ARCHETYPE_NODE_ID,
    TAG_ARCHETYPE_DETAILS,
    TAG_UID,
    TAG_FEEDER_AUDIT,
    TAG_LINKS,
];

type JsonMap = Map<String, Value>;

/// Decoder for flattened documents.
#[derive(Clone, Debug)]
pub struct Decoder {
    max_depth: usize,
}

impl Decoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            max_depth: config.max_depth(),
        }
    }

    /// Decodes a flattened document into canonical JSON.
    ///
    /// A document with a `/composition[...]` root key is decoded as a composition. Anything
    /// else is decoded as a stand-alone node (an item structure or a content item).
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] of kind [`crate::ErrorKind::InternalConsistency`] if the
    /// document does not have a shape the encoder produces, or nests deeper than the configured
    /// limit.
    pub fn decode(&self, document: &JsonMap) -> CodecResult<JsonMap> {
        match composition_root(document) {
            Some(root_key) => self.decode_composition_root(root_key, document),
            None => self.decode_node(document.clone(), 0),
        }
    }

    /// Decodes a composition document.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingCompositionRoot`] when the document has no
    /// `/composition[...]` key, and the errors of [`Decoder::decode`] otherwise.
    pub fn decode_composition(&self, document: &JsonMap) -> CodecResult<JsonMap> {
        let root_key = composition_root(document).ok_or(CodecError::MissingCompositionRoot)?;
        self.decode_composition_root(root_key, document)
    }

    /// Decodes a composition document straight into the record tree.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Decoder::decode_composition`], or [`CodecError::Openehr`] when
    /// the decoded JSON does not match the record tree.
    pub fn decode_to_composition(&self, document: &JsonMap) -> CodecResult<Composition> {
        let json = self.decode_composition(document)?;
        Ok(openehr::composition_from_value(Value::Object(json))?)
    }

    fn decode_composition_root(&self, root_key: &str, document: &JsonMap) -> CodecResult<JsonMap> {
        let content = match document.get(root_key) {
            Some(Value::Object(content)) => content.clone(),
            Some(other) => {
                return Err(CodecError::UnsupportedValue {
                    key: root_key.to_owned(),
                    detail: format!("composition content is {}", kind_of(other)),
                })
            }
            None => return Err(CodecError::MissingCompositionRoot),
        };

        let mut out = self.decode_node(content, 1)?;
        out.insert(TYPE_FIELD.to_owned(), Value::String(COMPOSITION_TYPE.to_owned()));
        if let Some(id) = node_id(root_key) {
            out.insert(ARCHETYPE_NODE_ID_FIELD.to_owned(), Value::String(id.to_owned()));
        }

        let attributes: JsonMap = document
            .iter()
            .filter(|(key, _)| key.as_str() != root_key && key.as_str() != TAG_CLASS)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        out.extend(self.decode_node(attributes, 1)?);
        Ok(out)
    }

    /// Decode one flattened map.
    fn decode_node(&self, mut map: JsonMap, depth: usize) -> CodecResult<JsonMap> {
        if depth > self.max_depth {
            return Err(CodecError::NestingTooDeep(self.max_depth));
        }
        normalise(&mut map);

        let shape = classify(&map);
        tracing::trace!(?shape, depth, "decoding map");
        let mut out = JsonMap::new();
        match shape {
            Shape::ItemsOnly => self.emit_items_only(map, &mut out, depth)?,
            Shape::MultiEvent => self.emit_multi_event(map, &mut out, depth)?,
            Shape::MultiContent => self.emit_multi_content(map, &mut out, depth)?,
            Shape::Plain => self.emit_plain(map, &mut out, depth)?,
        }
        rename_collections(&mut out);
        Ok(out)
    }

    fn emit_items_only(&self, map: JsonMap, out: &mut JsonMap, depth: usize) -> CodecResult<()> {
        let class = class_of(&map).map(str::to_owned);
        for (key, value) in map {
            if key == TAG_CLASS {
                continue;
            }
            self.emit(&key, value, class.as_deref(), out, depth)?;
        }
        if let Some(class) = class {
            out.insert(TYPE_FIELD.to_owned(), Value::String(camel_to_upper_snake(&class)));
        }
        Ok(())
    }

    fn emit_multi_event(&self, map: JsonMap, out: &mut JsonMap, depth: usize) -> CodecResult<()> {
        let class = class_of(&map).map(str::to_owned);
        let (events, rest): (JsonMap, JsonMap) = map
            .into_iter()
            .partition(|(key, _)| is_member_of(key, TAG_EVENTS));
        for (key, value) in events {
            self.emit_collection(&key, value, out, depth)?;
        }
        for (key, value) in rest {
            self.emit(&key, value, class.as_deref(), out, depth)?;
        }
        Ok(())
    }

    /// Content batches of a composition. Only the class tag and locatable attributes may sit
    /// next to them.
    fn emit_multi_content(
        &self,
        map: JsonMap,
        out: &mut JsonMap,
        depth: usize,
    ) -> CodecResult<()> {
        let mut has_class = false;
        let mut unexpected = Vec::new();
        for (key, value) in map {
            if is_member_of(&key, TAG_CONTENT) {
                self.emit_collection(&key, value, out, depth)?;
            } else if key == TAG_CLASS {
                has_class = true;
            } else if LOCATABLE_KEYS.contains(&key.as_str()) {
                self.emit(&key, value, None, out, depth)?;
            } else {
                unexpected.push(key);
            }
        }
        if !has_class {
            unexpected.push(TAG_CLASS.to_owned());
        }
        if !unexpected.is_empty() {
            return Err(CodecError::InconsistentContent(unexpected));
        }
        Ok(())
    }

    fn emit_plain(&self, map: JsonMap, out: &mut JsonMap, depth: usize) -> CodecResult<()> {
        let class = class_of(&map).map(str::to_owned);
        for (key, value) in map {
            self.emit(&key, value, class.as_deref(), out, depth)?;
        }
        Ok(())
    }

    /// Emit one key of a map. `class` is the class tag of the map the key belongs to.
    fn emit(
        &self,
        key: &str,
        value: Value,
        class: Option<&str>,
        out: &mut JsonMap,
        depth: usize,
    ) -> CodecResult<()> {
        match value {
            Value::Array(list) => self.emit_array(key, list, out, depth),
            Value::Object(child) => self.emit_object(key, child, class, out, depth),
            Value::String(text) => emit_string(key, text, out),
            Value::Number(_) | Value::Bool(_) => {
                out.insert(json_key(key), value);
                Ok(())
            }
            Value::Null => Err(CodecError::UnsupportedValue {
                key: key.to_owned(),
                detail: "null".to_owned(),
            }),
        }
    }

    fn emit_array(
        &self,
        key: &str,
        list: Vec<Value>,
        out: &mut JsonMap,
        depth: usize,
    ) -> CodecResult<()> {
        match key {
            TAG_NAME => {
                if let Some(first) = list.into_iter().next() {
                    out.insert(json_key(key), name_object(first)?);
                }
            }
            TAG_ARCHETYPE_NODE_ID => {
                if let Some(first) = list.into_iter().next() {
                    out.insert(ARCHETYPE_NODE_ID_FIELD.to_owned(), first);
                }
            }
            TAG_CLASS => {
                if let Some(class) = list.first().and_then(Value::as_str) {
                    out.insert(TYPE_FIELD.to_owned(), Value::String(camel_to_upper_snake(class)));
                }
            }
            _ => self.emit_collection(key, Value::Array(list), out, depth)?,
        }
        Ok(())
    }

    /// Emit the members stored under a key as a JSON array, appending to any array the field
    /// already holds. Object members are stamped with the node id of the key.
    fn emit_collection(
        &self,
        key: &str,
        value: Value,
        out: &mut JsonMap,
        depth: usize,
    ) -> CodecResult<()> {
        let field = json_key(key);
        let members = match value {
            Value::Array(list) => list,
            single => vec![single],
        };

        if field == MULTIMEDIA_DATA_FIELD && members.iter().all(Value::is_number) {
            let bytes = members
                .into_iter()
                .map(|member| byte(key, member))
                .collect::<CodecResult<Vec<_>>>()?;
            append(out, field, bytes);
            return Ok(());
        }

        let node = node_id(key);
        let mut decoded = Vec::with_capacity(members.len());
        for member in members {
            let mut member = self.decode_value(key, member, depth + 1)?;
            if let (Some(id), Value::Object(object)) = (node, &mut member) {
                object.insert(ARCHETYPE_NODE_ID_FIELD.to_owned(), Value::String(id.to_owned()));
            }
            decoded.push(member);
        }
        append(out, field, decoded);
        Ok(())
    }

    fn emit_object(
        &self,
        key: &str,
        mut child: JsonMap,
        class: Option<&str>,
        out: &mut JsonMap,
        depth: usize,
    ) -> CodecResult<()> {
        // A history stores its events in a nested map; they belong to the history itself.
        if key == TAG_EVENTS {
            if depth + 1 > self.max_depth {
                return Err(CodecError::NestingTooDeep(self.max_depth));
            }
            for (event_key, value) in child {
                self.emit(&event_key, value, class, out, depth + 1)?;
            }
            return Ok(());
        }

        if matches!(key, TAG_ORIGIN | TAG_TIME | TAG_TIMING) {
            if let Some(child_class) = class_of(&child).map(str::to_owned) {
                let decoded = self.decode_time_like(key, &mut child, &child_class, depth)?;
                out.insert(json_key(key), Value::Object(decoded));
                return Ok(());
            }
        }

        if key == TAG_VALUE {
            let mut decoded = self.decode_node(child, depth + 1)?;
            if let Some(class) = class.filter(|c| !is_structural(c)) {
                push_value_type(&mut decoded, class);
            }
            out.insert(json_key(key), Value::Object(decoded));
            return Ok(());
        }

        if COLLECTION_ATTRIBUTES.contains(&attribute(key)) && node_id(key).is_some() {
            return self.emit_collection(key, Value::Object(child), out, depth);
        }

        let mut decoded = self.decode_node(child, depth + 1)?;
        if let Some(id) = node_id(key) {
            decoded.insert(ARCHETYPE_NODE_ID_FIELD.to_owned(), Value::String(id.to_owned()));
        }
        out.insert(json_key(key), Value::Object(decoded));
        Ok(())
    }

    /// Decode a time-like map: `{"/value": {"value": ..}, "/$CLASS$": ..}`.
    ///
    /// The inner value map is promoted to the attribute itself and the epoch offset added for
    /// querying is dropped.
    fn decode_time_like(
        &self,
        key: &str,
        child: &mut JsonMap,
        class: &str,
        depth: usize,
    ) -> CodecResult<JsonMap> {
        let mut inner = match child.shift_remove(TAG_VALUE) {
            Some(Value::Object(inner)) => inner,
            Some(Value::String(text)) => {
                let mut inner = JsonMap::new();
                inner.insert(crate::constants::VALUE_FIELD.to_owned(), Value::String(text));
                inner
            }
            Some(other) => {
                return Err(CodecError::UnsupportedValue {
                    key: key.to_owned(),
                    detail: format!("time value is {}", kind_of(&other)),
                })
            }
            None => JsonMap::new(),
        };
        inner.shift_remove(EPOCH_OFFSET_FIELD);

        let mut decoded = self.decode_node(inner, depth + 1)?;
        decoded.insert(TYPE_FIELD.to_owned(), Value::String(camel_to_upper_snake(class)));
        Ok(decoded)
    }

    fn decode_value(&self, key: &str, value: Value, depth: usize) -> CodecResult<Value> {
        match value {
            Value::Object(map) => Ok(Value::Object(self.decode_node(map, depth)?)),
            Value::Array(list) => {
                if depth > self.max_depth {
                    return Err(CodecError::NestingTooDeep(self.max_depth));
                }
                Ok(Value::Array(
                    list.into_iter()
                        .map(|member| self.decode_value(key, member, depth + 1))
                        .collect::<CodecResult<Vec<_>>>()?,
                ))
            }
            Value::Null => Err(CodecError::UnsupportedValue {
                key: key.to_owned(),
                detail: "null collection member".to_owned(),
            }),
            scalar => Ok(scalar),
        }
    }
}

fn emit_string(key: &str, text: String, out: &mut JsonMap) -> CodecResult<()> {
    match key {
        // Value classes are pushed into the value itself; only node classes become a type.
        TAG_CLASS => {
            if is_structural(&text) {
                out.insert(TYPE_FIELD.to_owned(), Value::String(camel_to_upper_snake(&text)));
            }
        }
        TAG_PATH => {
            if last_node_id(&text).is_some() {
                out.insert(TYPE_FIELD.to_owned(), Value::String(ELEMENT_TYPE.to_owned()));
            }
        }
        TAG_NAME => {
            out.insert(json_key(key), name_object(Value::String(text))?);
        }
        _ => {
            out.insert(json_key(key), Value::String(text));
        }
    }
    Ok(())
}

/// Set the value's type from the enclosing element's class tag.
///
/// A generic class such as `DvInterval<DvQuantity>` types the value as `DV_INTERVAL` and every
/// untyped map inside it (the bounds) as `DV_QUANTITY`.
fn push_value_type(value: &mut JsonMap, class: &str) {
    let rm_type = camel_to_upper_snake(class);
    let (main, specialisation) = split_generic(&rm_type);
    if !value.contains_key(TYPE_FIELD) {
        value.insert(TYPE_FIELD.to_owned(), Value::String(main.to_owned()));
    }
    let Some(specialisation) = specialisation else {
        return;
    };
    for field in value.values_mut() {
        if let Value::Object(inner) = field {
            if !inner.contains_key(TYPE_FIELD) {
                inner.insert(TYPE_FIELD.to_owned(), Value::String(specialisation.to_owned()));
            }
        }
    }
}

/// Split `DV_INTERVAL<DV_QUANTITY>` into `("DV_INTERVAL", Some("DV_QUANTITY"))`.
pub(crate) fn split_generic(rm_type: &str) -> (&str, Option<&str>) {
    match (rm_type.find('<'), rm_type.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            (&rm_type[..open], Some(&rm_type[open + 1..close]))
        }
        _ => (rm_type, None),
    }
}

/// Unwrap attributes that hold one value but may be stored as a one-element list.
fn normalise(map: &mut JsonMap) {
    for key in [TAG_UID, TAG_FEEDER_AUDIT, TAG_ARCHETYPE_DETAILS] {
        let first = match map.get_mut(key) {
            Some(Value::Array(list)) if !list.is_empty() => list.swap_remove(0),
            _ => continue,
        };
        map.insert(key.to_owned(), first);
    }
    let nested_links = match map.get_mut(TAG_LINKS) {
        Some(Value::Array(list)) if list.len() == 1 && list[0].is_array() => list.pop(),
        _ => None,
    };
    if let Some(links) = nested_links {
        map.insert(TAG_LINKS.to_owned(), links);
    }
    if map.contains_key(ARCHETYPE_NODE_ID_FIELD) {
        map.shift_remove(TAG_ARCHETYPE_NODE_ID);
    }
}

/// Rename the collection field for owners whose collection is not called `items`.
fn rename_collections(out: &mut JsonMap) {
    let rm_type = out.get(TYPE_FIELD).and_then(Value::as_str).map(str::to_owned);
    match rm_type.as_deref() {
        Some(ITEM_SINGLE_TYPE) => {
            if let Some(items) = out.shift_remove(ITEMS_FIELD) {
                let item = match items {
                    Value::Array(list) => list.into_iter().next(),
                    single => Some(single),
                };
                if let Some(item) = item {
                    out.insert(ITEM_FIELD.to_owned(), item);
                }
            }
        }
        Some(ITEM_TABLE_TYPE) => {
            if let Some(rows) = out.shift_remove(ITEMS_FIELD) {
                out.insert(ROWS_FIELD.to_owned(), rows);
            }
        }
        _ => {}
    }
}

fn composition_root(document: &JsonMap) -> Option<&str> {
    document
        .keys()
        .find(|key| attribute(key) == TAG_COMPOSITION)
        .map(String::as_str)
}

/// Class tag of a map, stored as a string or as the first element of a list.
fn class_of(map: &JsonMap) -> Option<&str> {
    match map.get(TAG_CLASS)? {
        Value::String(class) => Some(class),
        Value::Array(list) => list.first().and_then(Value::as_str),
        _ => None,
    }
}

fn is_structural(class: &str) -> bool {
    STRUCTURAL_CLASSES.contains(&class)
}

fn append(out: &mut JsonMap, field: String, values: Vec<Value>) {
    match out.get_mut(&field) {
        Some(Value::Array(existing)) => existing.extend(values),
        _ => {
            out.insert(field, Value::Array(values));
        }
    }
}

fn byte(key: &str, value: Value) -> CodecResult<Value> {
    match value.as_u64() {
        Some(b) if b <= u64::from(u8::MAX) => Ok(value),
        _ => Err(CodecError::UnsupportedValue {
            key: key.to_owned(),
            detail: format!("{value} is not a byte"),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
