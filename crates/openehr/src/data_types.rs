//! OpenEHR RM data types.
//!
//! This module provides wire representations of the openEHR Reference Model (RM) data value
//! types that can appear as the value of an `ELEMENT`, as a node name, or as a typed attribute
//! of an entry.
//!
//! Key types:
//! - [`DataValue`]: the polymorphic `DATA_VALUE` sum type, dispatched on `_type`.
//! - [`TextValue`]: `DV_TEXT` or `DV_CODED_TEXT`, the type of every node name.
//! - [`ArchetypeId`]: parsed openEHR archetype identifier.
//!
//! Notes:
//! - Every struct serialises an explicit `_type` discriminator, matching canonical openEHR JSON.
//! - Polymorphic positions deserialise by reading `_type` first, so an unknown RM type is
//!   rejected rather than guessed.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::{OpenEhrError, RmType};

/// RM `TERMINOLOGY_ID`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "TERMINOLOGY_ID")]
pub struct TerminologyId {
    pub value: String,
}

/// RM `CODE_PHRASE`: a code within a terminology.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "CODE_PHRASE")]
pub struct CodePhrase {
    pub terminology_id: TerminologyId,
    pub code_string: String,
}

impl CodePhrase {
    /// Build a code phrase from a terminology name and code.
    pub fn new(terminology: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            terminology_id: TerminologyId {
                value: terminology.into(),
            },
            code_string: code.into(),
        }
    }
}

/// RM `TERM_MAPPING`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "TERM_MAPPING")]
pub struct TermMapping {
    #[serde(rename = "match")]
    pub match_kind: String,
    pub target: CodePhrase,
}

/// Simplified representation of the openEHR `DV_TEXT` data type.
///
/// Only the `value` is carried. Language, encoding, hyperlink and formatting from the full RM
/// class are not supported.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_TEXT")]
pub struct DvText {
    /// The plain text content.
    pub value: String,
}

/// RM `DV_CODED_TEXT`: text with a defining code and optional term mappings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_CODED_TEXT")]
pub struct DvCodedText {
    pub value: String,
    pub defining_code: CodePhrase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<TermMapping>,
}

/// Either plain or coded text.
///
/// This is the type of every node name. A name given without `_type` is read as coded text
/// when it carries a `defining_code`, and as plain text otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextValue {
    Text(DvText),
    Coded(DvCodedText),
}

impl TextValue {
    /// Plain text shorthand.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(DvText {
            value: value.into(),
        })
    }

    /// The display text regardless of variant.
    pub fn value(&self) -> &str {
        match self {
            Self::Text(text) => &text.value,
            Self::Coded(coded) => &coded.value,
        }
    }
}

impl RmType for TextValue {
    fn rm_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "DV_TEXT",
            Self::Coded(_) => "DV_CODED_TEXT",
        }
    }
}

impl Serialize for TextValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => text.serialize(serializer),
            Self::Coded(coded) => coded.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TextValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let rm_type = match tag_of(&value) {
            Some(tag) => tag.to_owned(),
            None if value.get("defining_code").is_some() => "DV_CODED_TEXT".to_owned(),
            None => "DV_TEXT".to_owned(),
        };
        match rm_type.as_str() {
            "DV_TEXT" => Ok(Self::Text(from_tagged(value)?)),
            "DV_CODED_TEXT" => Ok(Self::Coded(from_tagged(value)?)),
            other => Err(de::Error::custom(format!(
                "expected DV_TEXT or DV_CODED_TEXT, got {other}"
            ))),
        }
    }
}

/// RM `DV_QUANTITY`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "DV_QUANTITY")]
pub struct DvQuantity {
    pub magnitude: f64,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
}

/// RM `DV_COUNT`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_COUNT")]
pub struct DvCount {
    pub magnitude: i64,
}

/// RM `DV_BOOLEAN`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_BOOLEAN")]
pub struct DvBoolean {
    pub value: bool,
}

/// RM `DV_DATE_TIME`, held as its ISO 8601 text.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_DATE_TIME")]
pub struct DvDateTime {
    pub value: String,
}

impl DvDateTime {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// RM `DV_DATE`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_DATE")]
pub struct DvDate {
    pub value: String,
}

/// RM `DV_TIME`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_TIME")]
pub struct DvTime {
    pub value: String,
}

/// RM `DV_DURATION`, held as its ISO 8601 duration text.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_DURATION")]
pub struct DvDuration {
    pub value: String,
}

/// RM `DV_IDENTIFIER`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_IDENTIFIER")]
pub struct DvIdentifier {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigner: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
}

/// RM `DV_PROPORTION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "DV_PROPORTION")]
pub struct DvProportion {
    pub numerator: f64,
    pub denominator: f64,
    #[serde(rename = "type")]
    pub proportion_kind: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
}

/// RM `DV_ORDINAL`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_ORDINAL")]
pub struct DvOrdinal {
    pub value: i64,
    pub symbol: DvCodedText,
}

/// RM `DV_INTERVAL<T>`.
///
/// The bounds are any ordered data value. Both bounds, when present, are expected to share
/// one RM type; the codec rejects intervals whose bounds disagree.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "DV_INTERVAL")]
pub struct DvInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Box<DataValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Box<DataValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_included: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_included: Option<bool>,
    pub lower_unbounded: bool,
    pub upper_unbounded: bool,
}

impl DvInterval {
    /// The bounds that are present, lower first.
    pub fn bounds(&self) -> impl Iterator<Item = &DataValue> {
        self.lower.iter().chain(self.upper.iter()).map(|b| b.as_ref())
    }
}

/// RM `DV_URI`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_URI")]
pub struct DvUri {
    pub value: String,
}

/// RM `DV_EHR_URI`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_EHR_URI")]
pub struct DvEhrUri {
    pub value: String,
}

/// RM `DV_MULTIMEDIA`, optionally with its payload inline.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_MULTIMEDIA")]
pub struct DvMultimedia {
    pub media_type: CodePhrase,
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<DvUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

/// RM `DV_PARSABLE`: text in a named formalism (e.g. a timing expression).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "DV_PARSABLE")]
pub struct DvParsable {
    pub value: String,
    pub formalism: String,
}

/// RM `DATA_VALUE`: any value an `ELEMENT` can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Text(DvText),
    CodedText(DvCodedText),
    Quantity(DvQuantity),
    Count(DvCount),
    Boolean(DvBoolean),
    DateTime(DvDateTime),
    Date(DvDate),
    Time(DvTime),
    Duration(DvDuration),
    Identifier(DvIdentifier),
    Proportion(DvProportion),
    Ordinal(DvOrdinal),
    Interval(DvInterval),
    Multimedia(DvMultimedia),
    Parsable(DvParsable),
    Uri(DvUri),
    EhrUri(DvEhrUri),
}

impl RmType for DataValue {
    fn rm_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "DV_TEXT",
            Self::CodedText(_) => "DV_CODED_TEXT",
            Self::Quantity(_) => "DV_QUANTITY",
            Self::Count(_) => "DV_COUNT",
            Self::Boolean(_) => "DV_BOOLEAN",
            Self::DateTime(_) => "DV_DATE_TIME",
            Self::Date(_) => "DV_DATE",
            Self::Time(_) => "DV_TIME",
            Self::Duration(_) => "DV_DURATION",
            Self::Identifier(_) => "DV_IDENTIFIER",
            Self::Proportion(_) => "DV_PROPORTION",
            Self::Ordinal(_) => "DV_ORDINAL",
            Self::Interval(_) => "DV_INTERVAL",
            Self::Multimedia(_) => "DV_MULTIMEDIA",
            Self::Parsable(_) => "DV_PARSABLE",
            Self::Uri(_) => "DV_URI",
            Self::EhrUri(_) => "DV_EHR_URI",
        }
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(v) => v.serialize(serializer),
            Self::CodedText(v) => v.serialize(serializer),
            Self::Quantity(v) => v.serialize(serializer),
            Self::Count(v) => v.serialize(serializer),
            Self::Boolean(v) => v.serialize(serializer),
            Self::DateTime(v) => v.serialize(serializer),
            Self::Date(v) => v.serialize(serializer),
            Self::Time(v) => v.serialize(serializer),
            Self::Duration(v) => v.serialize(serializer),
            Self::Identifier(v) => v.serialize(serializer),
            Self::Proportion(v) => v.serialize(serializer),
            Self::Ordinal(v) => v.serialize(serializer),
            Self::Interval(v) => v.serialize(serializer),
            Self::Multimedia(v) => v.serialize(serializer),
            Self::Parsable(v) => v.serialize(serializer),
            Self::Uri(v) => v.serialize(serializer),
            Self::EhrUri(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let rm_type = required_tag(&value, "DATA_VALUE")?;
        let parsed = match rm_type.as_str() {
            "DV_TEXT" => Self::Text(from_tagged(value)?),
            "DV_CODED_TEXT" => Self::CodedText(from_tagged(value)?),
            "DV_QUANTITY" => Self::Quantity(from_tagged(value)?),
            "DV_COUNT" => Self::Count(from_tagged(value)?),
            "DV_BOOLEAN" => Self::Boolean(from_tagged(value)?),
            "DV_DATE_TIME" => Self::DateTime(from_tagged(value)?),
            "DV_DATE" => Self::Date(from_tagged(value)?),
            "DV_TIME" => Self::Time(from_tagged(value)?),
            "DV_DURATION" => Self::Duration(from_tagged(value)?),
            "DV_IDENTIFIER" => Self::Identifier(from_tagged(value)?),
            "DV_PROPORTION" => Self::Proportion(from_tagged(value)?),
            "DV_ORDINAL" => Self::Ordinal(from_tagged(value)?),
            "DV_INTERVAL" => Self::Interval(from_tagged(value)?),
            "DV_MULTIMEDIA" => Self::Multimedia(from_tagged(value)?),
            "DV_PARSABLE" => Self::Parsable(from_tagged(value)?),
            "DV_URI" => Self::Uri(from_tagged(value)?),
            "DV_EHR_URI" => Self::EhrUri(from_tagged(value)?),
            other => return Err(unknown_rm_type(other, "DATA_VALUE")),
        };
        Ok(parsed)
    }
}

/// Read the `_type` discriminator of a JSON object, if it has one.
pub(crate) fn tag_of(value: &Value) -> Option<&str> {
    value.get("_type").and_then(Value::as_str)
}

/// Read a mandatory `_type` discriminator for the polymorphic position `position`.
pub(crate) fn required_tag<E: de::Error>(value: &Value, position: &str) -> Result<String, E> {
    tag_of(value)
        .map(str::to_owned)
        .ok_or_else(|| E::custom(format!("{position} requires a _type discriminator")))
}

/// Deserialise a concrete RM struct from a buffered JSON value.
pub(crate) fn from_tagged<T: DeserializeOwned, E: de::Error>(value: Value) -> Result<T, E> {
    serde_json::from_value(value).map_err(E::custom)
}

pub(crate) fn unknown_rm_type<E: de::Error>(rm_type: &str, position: &str) -> E {
    E::custom(format!("unsupported {position} type {rm_type}"))
}

/// Parsed representation of an openEHR archetype identifier.
///
/// # Canonical Form
///
/// `<authority>-<rm_package>-<rm_class>.<concept>.v<version>`
///
/// Example: `openEHR-EHR-OBSERVATION.blood_pressure.v2`
///
/// The codec uses this to tell archetype roots (slots filled by another archetype) apart from
/// local `atNNNN` node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchetypeId {
    /// Archetype authority (e.g. "openEHR")
    pub authority: String,

    /// Reference Model package (e.g. "EHR")
    pub rm_package: String,

    /// Reference Model class (e.g. "OBSERVATION", "ITEM_TREE")
    pub rm_class: String,

    /// Archetype concept (e.g. "blood_pressure")
    pub concept: String,

    /// Version text after the `v` (e.g. "2" or "1.0.3")
    pub version: String,
}

impl ArchetypeId {
    /// Parse an archetype identifier from its canonical string form.
    ///
    /// # Arguments
    ///
    /// * `input` - Candidate archetype id, such as `openEHR-EHR-SECTION.adhoc.v1`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenEhrError::InvalidArchetypeId`] if any component is missing or empty, or if
    /// the version is not numeric.
    pub fn parse(input: &str) -> Result<Self, OpenEhrError> {
        let (qualified, rest) = input.split_once('.').ok_or_else(|| {
            OpenEhrError::InvalidArchetypeId(format!("missing concept in '{input}'"))
        })?;

        let mut parts = qualified.splitn(3, '-');
        let authority = parts.next().unwrap_or_default();
        let rm_package = parts.next().unwrap_or_default();
        let rm_class = parts.next().unwrap_or_default();
        if authority.is_empty() || rm_package.is_empty() || rm_class.is_empty() {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "expected <authority>-<package>-<class> in '{input}'"
            )));
        }

        let (concept, version) = rest.rsplit_once(".v").ok_or_else(|| {
            OpenEhrError::InvalidArchetypeId(format!("missing version in '{input}'"))
        })?;
        if concept.is_empty() {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "empty concept in '{input}'"
            )));
        }
        let numeric = !version.is_empty()
            && version
                .split('.')
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !numeric {
            return Err(OpenEhrError::InvalidArchetypeId(format!(
                "version must be numeric in '{input}'"
            )));
        }

        Ok(Self {
            authority: authority.to_owned(),
            rm_package: rm_package.to_owned(),
            rm_class: rm_class.to_owned(),
            concept: concept.to_owned(),
            version: version.to_owned(),
        })
    }

    /// Returns `true` when `node_id` is a full archetype id rather than a local at-code.
    pub fn is_archetype_id(node_id: &str) -> bool {
        Self::parse(node_id).is_ok()
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}.v{}",
            self.authority, self.rm_package, self.rm_class, self.concept, self.version
        )
    }
}

impl std::str::FromStr for ArchetypeId {
    type Err = OpenEhrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
