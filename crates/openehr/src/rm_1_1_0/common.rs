//! RM 1.1.0 support classes shared by every archetyped node.
//!
//! Responsibilities:
//! - [`Locatable`]: the attributes every archetyped node carries, flattened into the node's
//!   own JSON object.
//! - [`EntryAttributes`]: language, encoding, subject and the optional workflow, provider and
//!   participation attributes of a clinical entry.
//! - Identifier, reference, audit, link and party classes referenced by those attributes.

use crate::data_types::{
    from_tagged, required_tag, unknown_rm_type, CodePhrase, DvCodedText, DvEhrUri, DvIdentifier,
    DvInterval, DvText, TextValue,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Attributes of RM `LOCATABLE`.
///
/// Flattened into each node so the JSON matches canonical openEHR (`archetype_node_id` and
/// `name` sit next to the node's own attributes).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Locatable {
    pub archetype_node_id: String,
    pub name: TextValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype_details: Option<Archetyped>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeder_audit: Option<FeederAudit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Locatable {
    /// A locatable with only its mandatory identity.
    pub fn new(archetype_node_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            archetype_node_id: archetype_node_id.into(),
            name: TextValue::text(name),
            uid: None,
            archetype_details: None,
            feeder_audit: None,
            links: Vec::new(),
        }
    }
}

/// RM `HIER_OBJECT_ID`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "HIER_OBJECT_ID")]
pub struct HierObjectId {
    pub value: String,
}

/// RM `OBJECT_VERSION_ID`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "OBJECT_VERSION_ID")]
pub struct ObjectVersionId {
    pub value: String,
}

/// RM `OBJECT_ID` subtypes accepted as a node `uid` or party reference id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectId {
    Hier(HierObjectId),
    Version(ObjectVersionId),
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Hier(id) => id.serialize(serializer),
            Self::Version(id) => id.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match required_tag::<D::Error>(&value, "OBJECT_ID")?.as_str() {
            "HIER_OBJECT_ID" => Ok(Self::Hier(from_tagged(value)?)),
            "OBJECT_VERSION_ID" => Ok(Self::Version(from_tagged(value)?)),
            other => Err(unknown_rm_type(other, "OBJECT_ID")),
        }
    }
}

/// RM `ARCHETYPE_ID` as it appears inside `archetype_details`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "ARCHETYPE_ID")]
pub struct ArchetypeIdValue {
    pub value: String,
}

/// RM `TEMPLATE_ID`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "TEMPLATE_ID")]
pub struct TemplateId {
    pub value: String,
}

/// RM `ARCHETYPED`: archetype and template a root node was built from.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "ARCHETYPED")]
pub struct Archetyped {
    pub archetype_id: ArchetypeIdValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    pub rm_version: String,
}

/// RM `FEEDER_AUDIT_DETAILS` (simplified).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "FEEDER_AUDIT_DETAILS")]
pub struct FeederAuditDetails {
    pub system_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// RM `FEEDER_AUDIT`: provenance of data imported from another system.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "FEEDER_AUDIT")]
pub struct FeederAudit {
    pub originating_system_audit: FeederAuditDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub originating_system_item_ids: Vec<DvIdentifier>,
}

/// RM `LINK`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "LINK")]
pub struct Link {
    pub meaning: DvText,
    #[serde(rename = "type")]
    pub link_type: DvText,
    pub target: DvEhrUri,
}

/// RM `PARTY_REF` (simplified).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "PARTY_REF")]
pub struct PartyRef {
    pub id: ObjectId,
    pub namespace: String,
    #[serde(rename = "type")]
    pub ref_type: String,
}

/// RM `PARTY_SELF`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "PARTY_SELF")]
pub struct PartySelf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<PartyRef>,
}

/// RM `PARTY_IDENTIFIED` (simplified).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "PARTY_IDENTIFIED")]
pub struct PartyIdentified {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<PartyRef>,
}

/// RM `PARTY_PROXY`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartyProxy {
    SelfParty(PartySelf),
    Identified(PartyIdentified),
}

impl Default for PartyProxy {
    fn default() -> Self {
        Self::SelfParty(PartySelf::default())
    }
}

impl Serialize for PartyProxy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::SelfParty(p) => p.serialize(serializer),
            Self::Identified(p) => p.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PartyProxy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match required_tag::<D::Error>(&value, "PARTY_PROXY")?.as_str() {
            "PARTY_SELF" => Ok(Self::SelfParty(from_tagged(value)?)),
            "PARTY_IDENTIFIED" => Ok(Self::Identified(from_tagged(value)?)),
            other => Err(unknown_rm_type(other, "PARTY_PROXY")),
        }
    }
}

/// RM `OBJECT_REF`: a reference to an object held outside the record, such as a workflow or
/// guideline.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "OBJECT_REF")]
pub struct ObjectRef {
    pub id: ObjectId,
    pub namespace: String,
    #[serde(rename = "type")]
    pub ref_type: String,
}

/// RM `LOCATABLE_REF`: a reference to a node in another versioned object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "LOCATABLE_REF")]
pub struct LocatableRef {
    pub id: ObjectId,
    pub namespace: String,
    #[serde(rename = "type")]
    pub ref_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// RM `PARTICIPATION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "PARTICIPATION")]
pub struct Participation {
    pub function: TextValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DvCodedText>,
    pub performer: PartyProxy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DvInterval>,
}

/// Attributes of RM `ENTRY` carried by clinical entries.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EntryAttributes {
    pub language: CodePhrase,
    pub encoding: CodePhrase,
    pub subject: PartyProxy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<PartyProxy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_participations: Vec<Participation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<ObjectRef>,
}

impl Default for EntryAttributes {
    fn default() -> Self {
        Self {
            language: CodePhrase::new("ISO_639-1", "en"),
            encoding: CodePhrase::new("IANA_character-sets", "UTF-8"),
            subject: PartyProxy::default(),
            provider: None,
            other_participations: Vec::new(),
            workflow_id: None,
        }
    }
}
