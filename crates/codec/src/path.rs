//! Parsing of flattened-document keys and structural paths.
//!
//! A node key looks like `/items[at0004]` or
//! `/content[openEHR-EHR-OBSERVATION.blood_pressure.v2 and name/value='Blood pressure']`:
//! an attribute, then a bracketed node predicate holding the archetype node id and optionally
//! a name. A structural path is a run of such segments.

use crate::constants::NAME_PREDICATE;
use vpr_types::case::camel_to_snake;

/// Build a node key, adding a name predicate when `name` is given.
///
/// Single quotes inside the name are escaped so the predicate stays parseable.
pub fn node_key(attribute: &str, node_id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!(
            "{attribute}[{node_id}{NAME_PREDICATE}{}']",
            name.replace('\'', "\\'")
        ),
        None => format!("{attribute}[{node_id}]"),
    }
}

/// The attribute part of a key: everything before the node predicate.
pub fn attribute(key: &str) -> &str {
    match key.find('[') {
        Some(idx) => &key[..idx],
        None => key,
    }
}

/// Returns `true` if the key carries a node predicate.
pub fn is_node_predicate(key: &str) -> bool {
    node_id(key).is_some()
}

/// The archetype node id inside a key's predicate, without any name predicate.
pub fn node_id(key: &str) -> Option<&str> {
    if !key.starts_with('/') {
        return None;
    }
    let open = key.find('[')?;
    let close = key.rfind(']')?;
    if close <= open {
        return None;
    }
    let predicate = &key[open + 1..close];
    let id = match predicate.find(NAME_PREDICATE) {
        Some(idx) => &predicate[..idx],
        None => predicate,
    };
    (!id.trim().is_empty()).then_some(id)
}

/// The canonical JSON field name for a key (`/items[at0004]` -> `items`).
pub fn json_key(key: &str) -> String {
    let attr = attribute(key);
    camel_to_snake(attr.strip_prefix('/').unwrap_or(attr))
}

/// Split a structural path into segments, ignoring `/` inside predicates.
pub fn segments(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0usize;
    let bytes = path.as_bytes();
    for (idx, ch) in path.char_indices() {
        match ch {
            '\'' if idx == 0 || bytes[idx - 1] != b'\\' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            '/' if depth == 0 && !quoted => {
                if idx > start {
                    out.push(&path[start..idx]);
                }
                start = idx;
            }
            _ => {}
        }
    }
    if start < path.len() {
        out.push(&path[start..]);
    }
    out
}

/// The node id of the last segment of a structural path, if it has one.
pub fn last_node_id(path: &str) -> Option<&str> {
    segments(path).last().and_then(|segment| node_id(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_node_ids_with_and_without_names() {
        assert_eq!(node_id("/items[at0004]"), Some("at0004"));
        assert_eq!(
            node_id("/content[openEHR-EHR-OBSERVATION.bp.v2 and name/value='Blood pressure']"),
            Some("openEHR-EHR-OBSERVATION.bp.v2")
        );
        assert_eq!(node_id("/events"), None);
        assert_eq!(node_id("/$CLASS$"), None);
        assert_eq!(node_id("items[at0004]"), None);
        assert!(is_node_predicate("/data[at0001]"));
    }

    #[test]
    fn json_keys_drop_slash_and_predicate() {
        assert_eq!(json_key("/items[at0004 and name/value='x']"), "items");
        assert_eq!(json_key("/archetype_node_id"), "archetype_node_id");
        assert_eq!(json_key("codeString"), "code_string");
        assert_eq!(json_key("_type"), "_type");
    }

    #[test]
    fn segments_respect_predicates() {
        let path = "/content[openEHR-EHR-OBSERVATION.bp.v2 and name/value='a/b']/data[at0001]/items[at0004]";
        assert_eq!(
            segments(path),
            vec![
                "/content[openEHR-EHR-OBSERVATION.bp.v2 and name/value='a/b']",
                "/data[at0001]",
                "/items[at0004]"
            ]
        );
        assert_eq!(last_node_id(path), Some("at0004"));
        assert_eq!(last_node_id("/data/items"), None);
    }

    #[test]
    fn node_keys_escape_quotes() {
        assert_eq!(node_key("/items", "at0001", None), "/items[at0001]");
        assert_eq!(
            node_key("/items", "at0001", Some("Patient's view")),
            "/items[at0001 and name/value='Patient\\'s view']"
        );
        assert_eq!(
            node_id("/items[at0001 and name/value='Patient\\'s view']"),
            Some("at0001")
        );
    }
}
