//! Node names as canonical text objects.

use crate::constants::{DEFINING_CODE_FIELD, MAPPINGS_FIELD, TAG_NAME, TYPE_FIELD, VALUE_FIELD};
use crate::{CodecError, CodecResult};
use serde_json::{Map, Value};
use vpr_types::case::camel_to_snake;

const DV_TEXT: &str = "DV_TEXT";
const DV_CODED_TEXT: &str = "DV_CODED_TEXT";

/// Build the canonical name object for a stored name.
///
/// A plain string becomes `DV_TEXT`. A map with a `defining_code` becomes `DV_CODED_TEXT`,
/// keeping the code and any term mappings as stored, with their keys snake-cased.
pub(crate) fn name_object(stored: Value) -> CodecResult<Value> {
    let mut name = Map::new();
    match stored {
        Value::String(text) => {
            name.insert(TYPE_FIELD.to_owned(), Value::String(DV_TEXT.to_owned()));
            name.insert(VALUE_FIELD.to_owned(), Value::String(text));
        }
        Value::Object(mut fields) => {
            let value = fields.shift_remove(VALUE_FIELD).unwrap_or(Value::Null);
            if !value.is_string() {
                return Err(CodecError::UnsupportedValue {
                    key: TAG_NAME.to_owned(),
                    detail: "name has no text value".to_owned(),
                });
            }
            match fields.shift_remove(DEFINING_CODE_FIELD) {
                Some(code) => {
                    name.insert(TYPE_FIELD.to_owned(), Value::String(DV_CODED_TEXT.to_owned()));
                    name.insert(VALUE_FIELD.to_owned(), value);
                    name.insert(DEFINING_CODE_FIELD.to_owned(), snake_keys(code));
                    if let Some(mappings) = fields.shift_remove(MAPPINGS_FIELD) {
                        name.insert(MAPPINGS_FIELD.to_owned(), snake_keys(mappings));
                    }
                }
                None => {
                    name.insert(TYPE_FIELD.to_owned(), Value::String(DV_TEXT.to_owned()));
                    name.insert(VALUE_FIELD.to_owned(), value);
                }
            }
        }
        other => {
            return Err(CodecError::UnsupportedValue {
                key: TAG_NAME.to_owned(),
                detail: format!("name stored as {other}"),
            })
        }
    }
    Ok(Value::Object(name))
}

fn snake_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_to_snake(&key), snake_keys(value)))
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.into_iter().map(snake_keys).collect()),
        other => other,
    }
}
