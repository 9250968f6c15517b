//! RM 1.1.0 `COMPOSITION` and its content items.
//!
//! Responsibilities:
//! - Define the record tree a composition's content is built from: sections and the clinical
//!   entry classes.
//! - Dispatch polymorphic content on its `_type`.
//!
//! Notes:
//! - Context, composer, category, territory and language of a composition live in relational
//!   columns next to the stored document, so they are not part of this tree.

use super::common::{EntryAttributes, Locatable, LocatableRef, ObjectRef};
use super::data_structures::{History, ItemStructure};
use crate::data_types::{
    from_tagged, required_tag, unknown_rm_type, DvCodedText, DvDateTime, DvParsable, TextValue,
};
use crate::{Pathable, RmType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// RM `COMPOSITION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "COMPOSITION")]
pub struct Composition {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentItem>,
}

/// RM `OBSERVATION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "OBSERVATION")]
pub struct Observation {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(flatten)]
    pub entry: EntryAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_id: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ItemStructure>,
    pub data: History,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<History>,
}

/// RM `EVALUATION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "EVALUATION")]
pub struct Evaluation {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(flatten)]
    pub entry: EntryAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_id: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ItemStructure>,
    pub data: ItemStructure,
}

/// RM `ACTIVITY`.
///
/// `description` is mandatory in the RM; the codec rejects an activity without one.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ACTIVITY")]
pub struct Activity {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<ItemStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<DvParsable>,
    pub action_archetype_id: String,
}

/// RM `INSTRUCTION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "INSTRUCTION")]
pub struct Instruction {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(flatten)]
    pub entry: EntryAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_id: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ItemStructure>,
    pub narrative: TextValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<Activity>,
}

/// RM `ISM_TRANSITION`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "ISM_TRANSITION")]
pub struct IsmTransition {
    pub current_state: DvCodedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<DvCodedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub careflow_step: Option<DvCodedText>,
}

/// RM `ACTION`.
///
/// `description` is mandatory in the RM but legacy documents omit it, so it is optional here.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ACTION")]
pub struct Action {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(flatten)]
    pub entry: EntryAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guideline_id: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ItemStructure>,
    pub time: DvDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<ItemStructure>,
    pub ism_transition: IsmTransition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_details: Option<InstructionDetails>,
}

/// RM `INSTRUCTION_DETAILS`: the instruction activity an action was carried out for.
///
/// Workflow details (`wf_details`) are not carried.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "_type", rename = "INSTRUCTION_DETAILS")]
pub struct InstructionDetails {
    pub instruction_id: LocatableRef,
    pub activity_id: String,
}

/// RM `SECTION`: a heading grouping further content items.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "SECTION")]
pub struct Section {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ContentItem>,
}

/// RM `ADMIN_ENTRY`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ADMIN_ENTRY")]
pub struct AdminEntry {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(flatten)]
    pub entry: EntryAttributes,
    pub data: ItemStructure,
}

/// RM `GENERIC_ENTRY` (integration package).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "GENERIC_ENTRY")]
pub struct GenericEntry {
    #[serde(flatten)]
    pub locatable: Locatable,
    pub data: ItemStructure,
}

/// RM `CONTENT_ITEM`.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentItem {
    Observation(Observation),
    Evaluation(Evaluation),
    Instruction(Instruction),
    Action(Action),
    Section(Section),
    AdminEntry(AdminEntry),
    GenericEntry(GenericEntry),
}

impl ContentItem {
    /// Entry attributes, for the content items that are clinical entries.
    pub fn entry(&self) -> Option<&EntryAttributes> {
        match self {
            Self::Observation(o) => Some(&o.entry),
            Self::Evaluation(e) => Some(&e.entry),
            Self::Instruction(i) => Some(&i.entry),
            Self::Action(a) => Some(&a.entry),
            Self::AdminEntry(a) => Some(&a.entry),
            Self::Section(_) | Self::GenericEntry(_) => None,
        }
    }
}

macro_rules! pathable {
    ($($ty:ty => $rm:literal),* $(,)?) => {
        $(
            impl RmType for $ty {
                fn rm_type(&self) -> &'static str {
                    $rm
                }
            }

            impl Pathable for $ty {
                fn locatable(&self) -> &Locatable {
                    &self.locatable
                }
            }
        )*
    };
}

pathable! {
    Composition => "COMPOSITION",
    Observation => "OBSERVATION",
    Evaluation => "EVALUATION",
    Instruction => "INSTRUCTION",
    Activity => "ACTIVITY",
    Action => "ACTION",
    Section => "SECTION",
    AdminEntry => "ADMIN_ENTRY",
    GenericEntry => "GENERIC_ENTRY",
}

impl RmType for ContentItem {
    fn rm_type(&self) -> &'static str {
        match self {
            Self::Observation(i) => i.rm_type(),
            Self::Evaluation(i) => i.rm_type(),
            Self::Instruction(i) => i.rm_type(),
            Self::Action(i) => i.rm_type(),
            Self::Section(i) => i.rm_type(),
            Self::AdminEntry(i) => i.rm_type(),
            Self::GenericEntry(i) => i.rm_type(),
        }
    }
}

impl Pathable for ContentItem {
    fn locatable(&self) -> &Locatable {
        match self {
            Self::Observation(i) => &i.locatable,
            Self::Evaluation(i) => &i.locatable,
            Self::Instruction(i) => &i.locatable,
            Self::Action(i) => &i.locatable,
            Self::Section(i) => &i.locatable,
            Self::AdminEntry(i) => &i.locatable,
            Self::GenericEntry(i) => &i.locatable,
        }
    }
}

impl Serialize for ContentItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Observation(i) => i.serialize(serializer),
            Self::Evaluation(i) => i.serialize(serializer),
            Self::Instruction(i) => i.serialize(serializer),
            Self::Action(i) => i.serialize(serializer),
            Self::Section(i) => i.serialize(serializer),
            Self::AdminEntry(i) => i.serialize(serializer),
            Self::GenericEntry(i) => i.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let item = match required_tag::<D::Error>(&value, "CONTENT_ITEM")?.as_str() {
            "OBSERVATION" => Self::Observation(from_tagged(value)?),
            "EVALUATION" => Self::Evaluation(from_tagged(value)?),
            "INSTRUCTION" => Self::Instruction(from_tagged(value)?),
            "ACTION" => Self::Action(from_tagged(value)?),
            "SECTION" => Self::Section(from_tagged(value)?),
            "ADMIN_ENTRY" => Self::AdminEntry(from_tagged(value)?),
            "GENERIC_ENTRY" => Self::GenericEntry(from_tagged(value)?),
            other => return Err(unknown_rm_type(other, "CONTENT_ITEM")),
        };
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_nests_content_items() {
        let json = json!({
            "_type": "SECTION",
            "archetype_node_id": "openEHR-EHR-SECTION.adhoc.v1",
            "name": {"_type": "DV_TEXT", "value": "Plan"},
            "items": [{
                "_type": "ADMIN_ENTRY",
                "archetype_node_id": "openEHR-EHR-ADMIN_ENTRY.admission.v1",
                "name": {"_type": "DV_TEXT", "value": "Admission"},
                "language": {
                    "_type": "CODE_PHRASE",
                    "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "ISO_639-1"},
                    "code_string": "en"
                },
                "encoding": {
                    "_type": "CODE_PHRASE",
                    "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "IANA_character-sets"},
                    "code_string": "UTF-8"
                },
                "subject": {"_type": "PARTY_SELF"},
                "data": {
                    "_type": "ITEM_TREE",
                    "archetype_node_id": "at0001",
                    "name": {"_type": "DV_TEXT", "value": "Tree"}
                }
            }]
        });
        let item: ContentItem = serde_json::from_value(json.clone()).expect("parse section");
        let ContentItem::Section(section) = &item else {
            panic!("expected section");
        };
        assert_eq!(section.items.len(), 1);
        assert!(section.items[0].entry().is_some());
        assert_eq!(item.class_name(), "Section");
        assert_eq!(serde_json::to_value(&item).expect("serialise"), json);
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let err = serde_json::from_value::<ContentItem>(json!({
            "_type": "PROBLEM",
            "archetype_node_id": "x",
            "name": {"value": "x"}
        }))
        .expect_err("unknown type");
        assert!(err.to_string().contains("PROBLEM"));
    }

    #[test]
    fn action_carries_instruction_details_and_workflow_references() {
        let json = json!({
            "_type": "ACTION",
            "archetype_node_id": "openEHR-EHR-ACTION.medication.v1",
            "name": {"_type": "DV_TEXT", "value": "Given"},
            "language": {
                "_type": "CODE_PHRASE",
                "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "ISO_639-1"},
                "code_string": "en"
            },
            "encoding": {
                "_type": "CODE_PHRASE",
                "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "IANA_character-sets"},
                "code_string": "UTF-8"
            },
            "subject": {"_type": "PARTY_SELF"},
            "provider": {"_type": "PARTY_IDENTIFIED", "name": "Pharmacy"},
            "workflow_id": {
                "_type": "OBJECT_REF",
                "id": {"_type": "HIER_OBJECT_ID", "value": "wf-1"},
                "namespace": "local",
                "type": "WORKFLOW"
            },
            "guideline_id": {
                "_type": "OBJECT_REF",
                "id": {"_type": "HIER_OBJECT_ID", "value": "g-1"},
                "namespace": "local",
                "type": "GUIDELINE"
            },
            "time": {"_type": "DV_DATE_TIME", "value": "2024-01-01T08:00:00Z"},
            "ism_transition": {
                "_type": "ISM_TRANSITION",
                "current_state": {
                    "_type": "DV_CODED_TEXT",
                    "value": "completed",
                    "defining_code": {
                        "_type": "CODE_PHRASE",
                        "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "openehr"},
                        "code_string": "532"
                    }
                }
            },
            "instruction_details": {
                "_type": "INSTRUCTION_DETAILS",
                "instruction_id": {
                    "_type": "LOCATABLE_REF",
                    "id": {"_type": "OBJECT_VERSION_ID", "value": "v1::vpr::1"},
                    "namespace": "local",
                    "type": "INSTRUCTION"
                },
                "activity_id": "activities[at0001]"
            }
        });

        let item: ContentItem = serde_json::from_value(json.clone()).expect("parse action");
        let ContentItem::Action(action) = &item else {
            panic!("expected action");
        };
        let details = action.instruction_details.as_ref().expect("instruction details");
        assert_eq!(details.activity_id, "activities[at0001]");
        assert!(action.guideline_id.is_some());
        assert!(action.entry.workflow_id.is_some());
        assert_eq!(serde_json::to_value(&item).expect("serialise"), json);
    }
}
