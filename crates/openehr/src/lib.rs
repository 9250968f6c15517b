//! openEHR record-tree support.
//!
//! This crate defines the typed openEHR Reference Model (RM) tree that the VPR codec flattens
//! for storage, and translates that tree to and from canonical openEHR JSON (and YAML for
//! hand-written fixtures).
//!
//! Responsibilities:
//! - RM 1.1.0 classes under [`rm_1_1_0`] and data values under [`data_types`].
//! - The [`RmType`] and [`Pathable`] seams the codec walks the tree through.
//! - Strict readers that report the failing field path on a schema mismatch.

pub mod data_types;
pub mod rm_1_1_0;

pub use data_types::{ArchetypeId, DataValue, TextValue};
pub use rm_1_1_0::common::Locatable;
pub use rm_1_1_0::composition::{Composition, ContentItem};
pub use rm_1_1_0::data_structures::ItemStructure;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors returned by the `openehr` crate.
#[derive(Debug, Error)]
pub enum OpenEhrError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid archetype id: {0}")]
    InvalidArchetypeId(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// An RM class with a known type name.
pub trait RmType {
    /// The RM type name as written in canonical JSON `_type` fields (`ITEM_TREE`).
    fn rm_type(&self) -> &'static str;

    /// The class tag used by the flattened encoding (`ItemTree`).
    fn class_name(&self) -> String {
        vpr_types::case::upper_snake_to_camel(self.rm_type())
    }
}

/// An RM node that can be addressed by path: it has an archetype node id and a name.
pub trait Pathable: RmType {
    fn locatable(&self) -> &Locatable;

    fn archetype_node_id(&self) -> &str {
        &self.locatable().archetype_node_id
    }

    fn name(&self) -> &TextValue {
        &self.locatable().name
    }
}

/// Read a composition from canonical openEHR JSON.
///
/// # Errors
///
/// Returns [`OpenEhrError::Translation`] naming the failing field when the JSON does not match
/// the record tree, or [`OpenEhrError::InvalidJson`] when it is not JSON at all.
pub fn read_composition_json(json: &str) -> Result<Composition, OpenEhrError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    parse_with_path("COMPOSITION", &mut deserializer)
}

/// Read a composition from YAML shaped like canonical openEHR JSON.
///
/// # Errors
///
/// Returns [`OpenEhrError::Translation`] naming the failing field on a schema mismatch.
pub fn read_composition_yaml(yaml: &str) -> Result<Composition, OpenEhrError> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml);
    parse_with_path("COMPOSITION", deserializer)
}

/// Read a stand-alone item structure (for example EHR_STATUS `other_details`) from JSON.
///
/// # Errors
///
/// Returns [`OpenEhrError::Translation`] naming the failing field on a schema mismatch.
pub fn read_item_structure_json(json: &str) -> Result<ItemStructure, OpenEhrError> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    parse_with_path("ITEM_STRUCTURE", &mut deserializer)
}

/// Build a composition from an already parsed canonical JSON value.
///
/// # Errors
///
/// Returns [`OpenEhrError::Translation`] naming the failing field on a schema mismatch.
pub fn composition_from_value(value: serde_json::Value) -> Result<Composition, OpenEhrError> {
    parse_with_path("COMPOSITION", value)
}

/// Write a composition as canonical openEHR JSON.
///
/// # Errors
///
/// Returns [`OpenEhrError::InvalidJson`] if serialisation fails.
pub fn write_composition_json(composition: &Composition) -> Result<serde_json::Value, OpenEhrError> {
    Ok(serde_json::to_value(composition)?)
}

/// Deserialise with `serde_path_to_error` so schema mismatches name the failing field
/// (e.g. `content[0].data.events[1].time`).
fn parse_with_path<'de, T, D>(what: &str, deserializer: D) -> Result<T, OpenEhrError>
where
    T: DeserializeOwned,
    D: serde::Deserializer<'de>,
    D::Error: std::fmt::Display,
{
    match serde_path_to_error::deserialize(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(OpenEhrError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}
