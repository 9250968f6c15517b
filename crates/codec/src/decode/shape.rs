//! Shape classification of a flattened map.
//!
//! The flattened format keeps no marker saying "this map was a collection", so the shape is
//! read off the keys. The rules are heuristic and are checked in a fixed priority order.

use crate::constants::{
    ARCHETYPE_NODE_ID_FIELD, TAG_ARCHETYPE_DETAILS, TAG_ARCHETYPE_NODE_ID, TAG_CLASS, TAG_CONTENT,
    TAG_EVENTS, TAG_ITEMS, TAG_NAME, TYPE_FIELD,
};
use crate::path::{attribute, is_node_predicate};
use serde_json::{Map, Value};

/// Keys allowed next to `/items[...]` keys in an items-only map.
const ITEMS_ONLY_COMPANIONS: &[&str] = &[
    ARCHETYPE_NODE_ID_FIELD,
    TYPE_FIELD,
    TAG_ARCHETYPE_NODE_ID,
    TAG_ARCHETYPE_DETAILS,
    TAG_NAME,
    TAG_CLASS,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Only `/items[...]` keys plus trivial identity keys: a structure, cluster or section.
    ItemsOnly,
    /// More than one `/events[...]` key.
    MultiEvent,
    /// More than one `/content[...]` key.
    MultiContent,
    Plain,
}

/// Returns `true` for a node-predicate key under `collection` (`/items[at0001]`).
pub(crate) fn is_member_of(key: &str, collection: &str) -> bool {
    attribute(key) == collection && is_node_predicate(key)
}

pub(crate) fn classify(map: &Map<String, Value>) -> Shape {
    let count = |collection: &str| map.keys().filter(|k| is_member_of(k, collection)).count();

    let items = count(TAG_ITEMS);
    if items > 0
        && map
            .keys()
            .all(|k| is_member_of(k, TAG_ITEMS) || ITEMS_ONLY_COMPANIONS.contains(&k.as_str()))
    {
        return Shape::ItemsOnly;
    }
    if count(TAG_EVENTS) > 1 {
        return Shape::MultiEvent;
    }
    if count(TAG_CONTENT) > 1 {
        return Shape::MultiContent;
    }
    Shape::Plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape_of(value: Value) -> Shape {
        match value {
            Value::Object(map) => classify(&map),
            other => panic!("fixture is not an object: {other}"),
        }
    }

    #[test]
    fn items_with_identity_keys_are_items_only() {
        assert_eq!(
            shape_of(json!({
                "/items[at0001]": [{}],
                "/items[at0002]": [{}],
                "/items[at0003]": [{}],
                "/name": [{"value": "Tree"}],
                "/$CLASS$": ["ItemTree"],
                "/archetype_node_id": "at0000"
            })),
            Shape::ItemsOnly
        );
    }

    #[test]
    fn items_next_to_other_attributes_are_plain() {
        assert_eq!(
            shape_of(json!({
                "/items[at0001]": [{}],
                "/uid": {"_type": "HIER_OBJECT_ID", "value": "u"}
            })),
            Shape::Plain
        );
    }

    #[test]
    fn repeated_events_and_content_are_detected() {
        assert_eq!(
            shape_of(json!({"/events[at0002]": [{}], "/events[at0003]": [{}], "/name": []})),
            Shape::MultiEvent
        );
        assert_eq!(
            shape_of(json!({"/content[a]": [{}], "/content[b]": [{}], "/$CLASS$": ["Composition"]})),
            Shape::MultiContent
        );
        assert_eq!(
            shape_of(json!({"/content[a]": [{}], "/$CLASS$": ["Composition"]})),
            Shape::Plain
        );
    }

    #[test]
    fn bare_attribute_keys_are_not_members() {
        assert!(is_member_of("/items[at0001 and name/value='x']", TAG_ITEMS));
        assert!(!is_member_of("/items", TAG_ITEMS));
        assert!(!is_member_of("/events", TAG_EVENTS));
        assert_eq!(shape_of(json!({"/events": {}, "/origin": {}})), Shape::Plain);
    }
}
