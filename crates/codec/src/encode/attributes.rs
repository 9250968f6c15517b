//! Attribute-level encoding: values that are stored rather than walked.

use crate::constants::{
    EPOCH_OFFSET_FIELD, TAG_ARCHETYPE_DETAILS, TAG_CLASS, TAG_FEEDER_AUDIT, TAG_LINKS, TAG_UID,
    TAG_VALUE, VALUE_FIELD,
};
use crate::tree::{ensure_class, insert, insert_name, strip_type, PathMap, Tree};
use crate::{CodecError, CodecResult};
use chrono::DateTime;
use openehr::data_types::{DvDateTime, DvParsable};
use openehr::{DataValue, Locatable, Pathable, RmType};
use serde::Serialize;
use serde_json::{Map, Value};
use vpr_types::NonEmptyText;

/// Check the identity every keyed node needs: a non-blank archetype node id and name.
///
/// The values are returned as given; keys and paths are built from the untrimmed text.
///
/// # Errors
///
/// Returns [`CodecError::MissingArchetypeNodeId`] or [`CodecError::MissingName`].
pub(crate) fn identity(node: &dyn Pathable) -> CodecResult<(&str, &str)> {
    let node_id = node.archetype_node_id();
    NonEmptyText::new(node_id).map_err(|_| CodecError::MissingArchetypeNodeId {
        class: node.class_name(),
    })?;
    let name = node.name().value();
    NonEmptyText::new(name).map_err(|_| CodecError::MissingName {
        class: node.class_name(),
        node_id: node_id.to_owned(),
    })?;
    Ok((node_id, name))
}

/// Canonical JSON of an attribute value.
pub(crate) fn canonical<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Store the optional locatable attributes of a node.
pub(crate) fn insert_locatable<T: Tree>(tree: &mut T, locatable: &Locatable) -> CodecResult<()> {
    if let Some(uid) = &locatable.uid {
        insert(tree, None, TAG_UID.to_owned(), canonical(uid)?, None)?;
    }
    if let Some(details) = &locatable.archetype_details {
        insert(tree, None, TAG_ARCHETYPE_DETAILS.to_owned(), canonical(details)?, None)?;
    }
    if let Some(audit) = &locatable.feeder_audit {
        insert(tree, None, TAG_FEEDER_AUDIT.to_owned(), canonical(audit)?, None)?;
    }
    if !locatable.links.is_empty() {
        insert(tree, None, TAG_LINKS.to_owned(), canonical(&locatable.links)?, None)?;
    }
    Ok(())
}

/// Complete a node map: its name if not yet present, its locatable attributes and its class.
pub(crate) fn finish_node<T: Tree>(tree: &mut T, node: &dyn Pathable) -> CodecResult<()> {
    if !tree.contains_key(crate::constants::TAG_NAME) {
        insert_name(tree, node.name())?;
    }
    insert_locatable(tree, node.locatable())?;
    ensure_class(tree, &node.class_name());
    Ok(())
}

/// Time-like map for a date-time attribute.
///
/// The seconds since the Unix epoch are added when the value is a full RFC 3339 date-time, so
/// stored documents can be range-queried.
pub(crate) fn time_map(time: &DvDateTime) -> PathMap {
    let mut value = Map::new();
    value.insert(VALUE_FIELD.to_owned(), Value::String(time.value.clone()));
    if let Some(offset) = epoch_offset(&time.value) {
        value.insert(EPOCH_OFFSET_FIELD.to_owned(), Value::from(offset));
    }
    time_like(value, "DvDateTime")
}

/// Time-like map for a parsable expression such as an activity timing.
pub(crate) fn parsable_map(parsable: &DvParsable) -> PathMap {
    let mut value = Map::new();
    value.insert(VALUE_FIELD.to_owned(), Value::String(parsable.value.clone()));
    value.insert(
        crate::constants::FORMALISM_FIELD.to_owned(),
        Value::String(parsable.formalism.clone()),
    );
    time_like(value, "DvParsable")
}

fn time_like(value: Map<String, Value>, class: &str) -> PathMap {
    let mut map = PathMap::new();
    map.put(TAG_VALUE.to_owned(), Value::Object(value));
    map.put(TAG_CLASS.to_owned(), Value::String(class.to_owned()));
    map
}

pub(crate) fn epoch_offset(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.timestamp())
}

/// The stored form of an element value: its canonical JSON without the type discriminator.
///
/// Interval bounds lose theirs as well; the bound type travels in the composite class tag.
pub(crate) fn data_value_json(value: &DataValue) -> CodecResult<Value> {
    let mut json = strip_type(canonical(value)?);
    if let (DataValue::Interval(_), Value::Object(map)) = (value, &mut json) {
        for bound in ["lower", "upper"] {
            if let Some(stripped) = map.get_mut(bound) {
                *stripped = strip_type(std::mem::take(stripped));
            }
        }
    }
    Ok(json)
}

/// Class tag of an element value. Intervals carry their bound type: `DvInterval<DvQuantity>`.
///
/// # Errors
///
/// Returns [`CodecError::IntervalTypeMismatch`] when the two bounds have different types.
pub(crate) fn value_class(value: &DataValue) -> CodecResult<String> {
    let DataValue::Interval(interval) = value else {
        return Ok(value.class_name());
    };
    let mut bounds = interval.bounds();
    let Some(first) = bounds.next() else {
        return Ok(value.class_name());
    };
    if let Some(second) = bounds.next() {
        if first.rm_type() != second.rm_type() {
            return Err(CodecError::IntervalTypeMismatch {
                lower: first.rm_type().to_owned(),
                upper: second.rm_type().to_owned(),
            });
        }
    }
    Ok(format!("{}<{}>", value.class_name(), first.class_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use openehr::data_types::{DvCount, DvInterval, DvQuantity};
    use openehr::rm_1_1_0::data_structures::Element;
    use serde_json::json;

    fn quantity(magnitude: f64) -> Box<DataValue> {
        Box::new(DataValue::Quantity(DvQuantity {
            magnitude,
            units: "mm[Hg]".into(),
            precision: None,
        }))
    }

    fn interval(lower: Option<Box<DataValue>>, upper: Option<Box<DataValue>>) -> DataValue {
        DataValue::Interval(DvInterval {
            lower,
            upper,
            lower_included: Some(true),
            upper_included: None,
            lower_unbounded: false,
            upper_unbounded: false,
        })
    }

    #[test]
    fn interval_class_carries_bound_type() {
        let value = interval(Some(quantity(1.0)), Some(quantity(2.0)));
        assert_eq!(value_class(&value).expect("class"), "DvInterval<DvQuantity>");

        let unbounded = interval(None, None);
        assert_eq!(value_class(&unbounded).expect("class"), "DvInterval");
    }

    #[test]
    fn mismatched_interval_bounds_are_rejected() {
        let count = Box::new(DataValue::Count(DvCount { magnitude: 3 }));
        let err = value_class(&interval(Some(quantity(1.0)), Some(count)))
            .expect_err("bounds disagree");
        assert!(matches!(
            &err,
            CodecError::IntervalTypeMismatch { lower, upper }
                if lower == "DV_QUANTITY" && upper == "DV_COUNT"
        ));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn value_json_drops_type_discriminators() {
        let value = interval(Some(quantity(1.0)), None);
        assert_eq!(
            data_value_json(&value).expect("json"),
            json!({
                "lower": {"magnitude": 1.0, "units": "mm[Hg]"},
                "lower_included": true,
                "lower_unbounded": false,
                "upper_unbounded": false
            })
        );
    }

    #[test]
    fn time_map_adds_epoch_offset_for_full_date_times() {
        let map = time_map(&DvDateTime::new("2024-01-01T10:00:00Z"));
        assert_eq!(
            map.into_value(),
            json!({
                "/value": {"value": "2024-01-01T10:00:00Z", "epoch_offset": 1704103200},
                "/$CLASS$": "DvDateTime"
            })
        );

        let partial = time_map(&DvDateTime::new("2024-01"));
        assert_eq!(
            partial.into_value(),
            json!({"/value": {"value": "2024-01"}, "/$CLASS$": "DvDateTime"})
        );
    }

    #[test]
    fn identity_requires_node_id_and_name() {
        let mut element = Element {
            locatable: Locatable::new(" ", "Systolic"),
            value: None,
            null_flavour: None,
            null_reason: None,
        };
        assert!(matches!(
            identity(&element),
            Err(CodecError::MissingArchetypeNodeId { class }) if class == "Element"
        ));

        element.locatable = Locatable::new("at0004", "");
        assert!(matches!(
            identity(&element),
            Err(CodecError::MissingName { node_id, .. }) if node_id == "at0004"
        ));

        element.locatable = Locatable::new(" at0004 ", " Systolic ");
        assert_eq!(
            identity(&element).expect("identity"),
            (" at0004 ", " Systolic ")
        );
    }
}
