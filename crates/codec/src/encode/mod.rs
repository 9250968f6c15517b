//! Record tree to flattened document.
//!
//! Responsibilities:
//! - Walk a composition (or a stand-alone item structure) depth first and produce the
//!   path-keyed document stored for it.
//! - Keep the [`PathStack`] in step with the walk, so element paths and containment labels
//!   describe where each node sits.
//! - Reject record trees that break the identity rules the encoding depends on.
//!
//! Notes:
//! - An [`Encoder`] is consumed by the encode call. Each call starts from an empty path stack
//!   and ends with every frame released.

mod attributes;
mod structure;

use crate::config::CodecConfig;
use crate::constants::{
    TAG_ACTION_ARCHETYPE_ID, TAG_ACTIVITIES, TAG_ARCHETYPE_NODE_ID, TAG_COMPOSITION, TAG_CONTENT,
    TAG_DATA, TAG_DESCRIPTION, TAG_ENCODING, TAG_GUIDELINE_ID, TAG_INSTRUCTION_DETAILS,
    TAG_ISM_TRANSITION, TAG_ITEMS, TAG_LANGUAGE, TAG_NARRATIVE, TAG_OTHER_PARTICIPATIONS,
    TAG_PATH, TAG_PROTOCOL, TAG_PROVIDER, TAG_STATE, TAG_SUBJECT, TAG_TIME, TAG_TIMING,
    TAG_WORKFLOW_ID,
};
use crate::node_tag::NodeTagger;
use crate::path::node_key;
use crate::path_stack::{PathStack, StackFrame, StackHolder};
use crate::tree::{force_class, insert, insert_name, Container, MultiMap, PathMap, Tree};
use crate::{CodecError, CodecResult};
use attributes::{canonical, finish_node, identity, insert_locatable, parsable_map, time_map};
use openehr::rm_1_1_0::common::{EntryAttributes, ObjectRef};
use openehr::rm_1_1_0::composition::{
    Action, Activity, AdminEntry, Evaluation, GenericEntry, Instruction, Observation, Section,
};
use openehr::rm_1_1_0::data_structures::History;
use openehr::{Composition, ContentItem, ItemStructure, Pathable, RmType, TextValue};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A flattened document and the containment labels collected while producing it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EncodedDocument {
    pub document: Map<String, Value>,
    pub containment: BTreeMap<String, String>,
}

/// Depth-first encoder for one record tree.
#[derive(Debug)]
pub struct Encoder {
    tagger: NodeTagger,
    stack: PathStack,
}

impl StackHolder for Encoder {
    fn path_stack(&mut self) -> &mut PathStack {
        &mut self.stack
    }
}

impl Encoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            tagger: NodeTagger::new(config.walker_mode()),
            stack: PathStack::new(),
        }
    }

    /// Encodes a composition into its flattened document.
    ///
    /// The document holds the content under a single
    /// `/composition[<node_id> and name/value='<name>']` key, next to the composition's own
    /// name, locatable attributes and class tag. The class tag of the content and of the
    /// document is always the composition's, whatever its content items recorded.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] of kind [`crate::ErrorKind::MalformedInput`] if:
    /// - a node has an empty archetype node id or name,
    /// - an activity has no description,
    /// - an interval value has bounds of different types.
    pub fn encode_composition(mut self, composition: &Composition) -> CodecResult<EncodedDocument> {
        let (node_id, name) = identity(composition)?;
        let class = composition.class_name();
        tracing::debug!(node_id = %node_id, mode = %self.tagger.mode(), "encoding composition");

        let mut content = MultiMap::new();
        for item in &composition.content {
            let key = self.tagger.tag(TAG_CONTENT, Some(item), Container::Multi);
            let encoded = self.encode_content_item(TAG_CONTENT, item)?;
            content.put(key, encoded.into_value());
        }
        force_class(&mut content, &class);

        let mut document = PathMap::new();
        document.put(
            node_key(TAG_COMPOSITION, node_id, Some(name)),
            content.into_value(),
        );
        insert_name(&mut document, composition.name())?;
        insert_locatable(&mut document, &composition.locatable)?;
        force_class(&mut document, &class);

        Ok(self.finish(document))
    }

    /// Encodes a stand-alone item structure, such as the `other_details` of an EHR status.
    ///
    /// The result also records the structure's archetype node id at its top level, since no
    /// parent key carries it.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for the same malformed-input conditions as
    /// [`Encoder::encode_composition`].
    pub fn encode_item_structure(
        mut self,
        structure: &ItemStructure,
    ) -> CodecResult<EncodedDocument> {
        tracing::debug!(
            node_id = %structure.archetype_node_id(),
            mode = %self.tagger.mode(),
            "encoding item structure"
        );
        let mut map = self.encode_structure(None, structure)?;
        map.put(
            TAG_ARCHETYPE_NODE_ID.to_owned(),
            Value::String(structure.archetype_node_id().to_owned()),
        );
        Ok(self.finish(map))
    }

    fn finish(self, document: PathMap) -> EncodedDocument {
        debug_assert_eq!(self.stack.depth(), 0, "unbalanced path stack");
        EncodedDocument {
            document: document.into_map(),
            containment: self.stack.into_containment(),
        }
    }

    /// Complete a time-like map with the name of the node owning it and the attribute's path.
    fn time_like_value(
        &self,
        mut map: PathMap,
        attribute: &str,
        owner_name: Option<&TextValue>,
    ) -> CodecResult<Value> {
        if let Some(name) = owner_name {
            insert_name(&mut map, name)?;
        }
        if let Some(path) = self.tagger.attribute_path(&self.stack, attribute) {
            map.put(TAG_PATH.to_owned(), Value::String(path));
        }
        Ok(map.into_value())
    }

    /// Key for an attribute holding a plain value (`/origin`, `/language`).
    fn attribute_key(&self, attribute: &str) -> String {
        self.tagger.tag(attribute, None, Container::Unique)
    }

    fn encode_content_item(&mut self, attribute: &str, item: &ContentItem) -> CodecResult<PathMap> {
        let (node_id, name) = identity(item)?;
        let mut frame = StackFrame::enter(self, attribute, node_id, Some(name));
        tracing::debug!(path = %frame.stack.path_dump(), class = item.rm_type(), "content item");
        match item {
            ContentItem::Observation(observation) => frame.encode_observation(observation),
            ContentItem::Evaluation(evaluation) => frame.encode_evaluation(evaluation),
            ContentItem::Instruction(instruction) => frame.encode_instruction(instruction),
            ContentItem::Action(action) => frame.encode_action(action),
            ContentItem::Section(section) => frame.encode_section(section),
            ContentItem::AdminEntry(entry) => frame.encode_admin_entry(entry),
            ContentItem::GenericEntry(entry) => frame.encode_generic_entry(entry),
        }
    }

    fn encode_section(&mut self, section: &Section) -> CodecResult<PathMap> {
        let mut items = MultiMap::new();
        for child in &section.items {
            let key = self.tagger.tag(TAG_ITEMS, Some(child), Container::Multi);
            let encoded = self.encode_content_item(TAG_ITEMS, child)?;
            items.put(key, encoded.into_value());
        }
        force_class(&mut items, &section.class_name());
        finish_node(&mut items, section)?;
        Ok(items.fix_locatable_attributes())
    }

    fn encode_observation(&mut self, observation: &Observation) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        self.insert_entry(&mut map, observation, &observation.entry, observation.guideline_id.as_ref())?;
        self.insert_structure(&mut map, observation, TAG_PROTOCOL, observation.protocol.as_ref())?;
        self.insert_history(&mut map, observation, TAG_DATA, Some(&observation.data))?;
        self.insert_history(&mut map, observation, TAG_STATE, observation.state.as_ref())?;
        finish_node(&mut map, observation)?;
        Ok(map)
    }

    fn encode_evaluation(&mut self, evaluation: &Evaluation) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        self.insert_entry(&mut map, evaluation, &evaluation.entry, evaluation.guideline_id.as_ref())?;
        self.insert_structure(&mut map, evaluation, TAG_PROTOCOL, evaluation.protocol.as_ref())?;
        self.insert_structure(&mut map, evaluation, TAG_DATA, Some(&evaluation.data))?;
        finish_node(&mut map, evaluation)?;
        Ok(map)
    }

    fn encode_instruction(&mut self, instruction: &Instruction) -> CodecResult<PathMap> {
        let class = instruction.class_name();
        let mut map = PathMap::new();
        self.insert_entry(&mut map, instruction, &instruction.entry, instruction.guideline_id.as_ref())?;
        self.insert_structure(&mut map, instruction, TAG_PROTOCOL, instruction.protocol.as_ref())?;
        insert(
            &mut map,
            Some(instruction),
            self.attribute_key(TAG_NARRATIVE),
            canonical(&instruction.narrative)?,
            Some(&class),
        )?;

        let mut activities = MultiMap::new();
        for activity in &instruction.activities {
            let key = self.tagger.tag(TAG_ACTIVITIES, Some(activity), Container::Multi);
            let encoded = self.encode_activity(activity)?;
            activities.put(key, encoded.into_value());
        }
        for (key, value) in activities.into_map() {
            insert(&mut map, Some(instruction), key, value, Some(&class))?;
        }

        finish_node(&mut map, instruction)?;
        Ok(map)
    }

    fn encode_activity(&mut self, activity: &Activity) -> CodecResult<PathMap> {
        let (node_id, name) = identity(activity)?;
        let mut frame = StackFrame::enter(self, TAG_ACTIVITIES, node_id, Some(name));
        frame.activity_body(activity)
    }

    fn activity_body(&mut self, activity: &Activity) -> CodecResult<PathMap> {
        let class = activity.class_name();
        let description =
            activity
                .description
                .as_ref()
                .ok_or_else(|| CodecError::MissingActivityDescription {
                    node_id: activity.archetype_node_id().to_owned(),
                })?;

        let mut map = PathMap::new();
        let key = self
            .tagger
            .tag(TAG_DESCRIPTION, Some(description), Container::Unique);
        let encoded = self.encode_structure(Some(TAG_DESCRIPTION), description)?;
        insert(&mut map, Some(activity), key, encoded.into_value(), Some(&class))?;

        if let Some(timing) = &activity.timing {
            insert(
                &mut map,
                Some(activity),
                self.attribute_key(TAG_TIMING),
                self.time_like_value(parsable_map(timing), TAG_TIMING, None)?,
                Some(&class),
            )?;
        }
        insert(
            &mut map,
            Some(activity),
            self.attribute_key(TAG_ACTION_ARCHETYPE_ID),
            Value::String(activity.action_archetype_id.clone()),
            Some(&class),
        )?;

        finish_node(&mut map, activity)?;
        Ok(map)
    }

    fn encode_action(&mut self, action: &Action) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        self.insert_entry(&mut map, action, &action.entry, action.guideline_id.as_ref())?;
        self.insert_structure(&mut map, action, TAG_PROTOCOL, action.protocol.as_ref())?;
        insert(
            &mut map,
            Some(action),
            self.attribute_key(TAG_TIME),
            self.time_like_value(time_map(&action.time), TAG_TIME, Some(action.name()))?,
            None,
        )?;
        if action.description.is_none() {
            tracing::warn!(
                path = %self.stack.path_dump(),
                node_id = %action.archetype_node_id(),
                "action has no description"
            );
        }
        self.insert_structure(&mut map, action, TAG_DESCRIPTION, action.description.as_ref())?;
        insert(
            &mut map,
            Some(action),
            self.attribute_key(TAG_ISM_TRANSITION),
            canonical(&action.ism_transition)?,
            None,
        )?;
        if let Some(details) = &action.instruction_details {
            insert(
                &mut map,
                Some(action),
                self.attribute_key(TAG_INSTRUCTION_DETAILS),
                canonical(details)?,
                None,
            )?;
        }
        finish_node(&mut map, action)?;
        Ok(map)
    }

    fn encode_admin_entry(&mut self, entry: &AdminEntry) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        self.insert_entry(&mut map, entry, &entry.entry, None)?;
        self.insert_structure(&mut map, entry, TAG_DATA, Some(&entry.data))?;
        finish_node(&mut map, entry)?;
        Ok(map)
    }

    fn encode_generic_entry(&mut self, entry: &GenericEntry) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        self.insert_structure(&mut map, entry, TAG_DATA, Some(&entry.data))?;
        finish_node(&mut map, entry)?;
        Ok(map)
    }

    /// Entry attributes of a clinical entry, as canonical JSON. Care entries also pass their
    /// guideline reference.
    fn insert_entry(
        &self,
        map: &mut PathMap,
        owner: &dyn Pathable,
        entry: &EntryAttributes,
        guideline_id: Option<&ObjectRef>,
    ) -> CodecResult<()> {
        let class = owner.class_name();
        let mut attributes = vec![
            (TAG_LANGUAGE, canonical(&entry.language)?),
            (TAG_ENCODING, canonical(&entry.encoding)?),
            (TAG_SUBJECT, canonical(&entry.subject)?),
        ];
        if let Some(provider) = &entry.provider {
            attributes.push((TAG_PROVIDER, canonical(provider)?));
        }
        if !entry.other_participations.is_empty() {
            attributes.push((TAG_OTHER_PARTICIPATIONS, canonical(&entry.other_participations)?));
        }
        if let Some(workflow_id) = &entry.workflow_id {
            attributes.push((TAG_WORKFLOW_ID, canonical(workflow_id)?));
        }
        if let Some(guideline_id) = guideline_id {
            attributes.push((TAG_GUIDELINE_ID, canonical(guideline_id)?));
        }
        for (attribute, value) in attributes {
            insert(map, Some(owner), self.attribute_key(attribute), value, Some(&class))?;
        }
        Ok(())
    }

    /// Encode an optional structure attribute of `owner` and insert it under its node key.
    fn insert_structure(
        &mut self,
        map: &mut PathMap,
        owner: &dyn Pathable,
        attribute: &str,
        structure: Option<&ItemStructure>,
    ) -> CodecResult<()> {
        let Some(structure) = structure else {
            return Ok(());
        };
        let key = self.tagger.tag(attribute, Some(structure), Container::Unique);
        let encoded = self.encode_structure(Some(attribute), structure)?;
        insert(
            map,
            Some(owner),
            key,
            encoded.into_value(),
            Some(&owner.class_name()),
        )
    }

    fn insert_history(
        &mut self,
        map: &mut PathMap,
        owner: &dyn Pathable,
        attribute: &str,
        history: Option<&History>,
    ) -> CodecResult<()> {
        let Some(history) = history else {
            return Ok(());
        };
        let key = self.tagger.tag(attribute, Some(history), Container::Unique);
        let encoded = self.encode_history(attribute, history)?;
        insert(
            map,
            Some(owner),
            key,
            encoded.into_value(),
            Some(&owner.class_name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalkerMode;
    use crate::ErrorKind;
    use openehr::data_types::{CodePhrase, DvCodedText, DvDateTime, DvParsable, DvText};
    use openehr::rm_1_1_0::composition::IsmTransition;
    use openehr::rm_1_1_0::data_structures::{Element, Item, ItemTree};
    use openehr::{DataValue, Locatable, TextValue};
    use serde_json::json;

    fn tree(id: &str, element_id: &str) -> ItemStructure {
        ItemStructure::Tree(ItemTree {
            locatable: Locatable::new(id, "Tree"),
            items: vec![Item::Element(Element {
                locatable: Locatable::new(element_id, "Comment"),
                value: Some(DataValue::Text(DvText {
                    value: "stable".into(),
                })),
                null_flavour: None,
                null_reason: None,
            })],
        })
    }

    fn evaluation(id: &str, name: &str) -> ContentItem {
        ContentItem::Evaluation(Evaluation {
            locatable: Locatable::new(id, name),
            entry: EntryAttributes::default(),
            guideline_id: None,
            protocol: None,
            data: tree("at0001", "at0002"),
        })
    }

    fn composition(content: Vec<ContentItem>) -> Composition {
        Composition {
            locatable: Locatable::new("openEHR-EHR-COMPOSITION.encounter.v1", "Encounter"),
            content,
        }
    }

    fn encode(composition: &Composition) -> CodecResult<EncodedDocument> {
        Encoder::new(&CodecConfig::default()).encode_composition(composition)
    }

    fn instruction(description: Option<ItemStructure>) -> ContentItem {
        ContentItem::Instruction(Instruction {
            locatable: Locatable::new("openEHR-EHR-INSTRUCTION.medication_order.v3", "Order"),
            entry: EntryAttributes::default(),
            guideline_id: None,
            protocol: None,
            narrative: TextValue::text("Take daily"),
            activities: vec![Activity {
                locatable: Locatable::new("at0001", "Order"),
                description,
                timing: Some(DvParsable {
                    value: "R1/2024-01-01T08:00:00Z/P1D".into(),
                    formalism: "timing".into(),
                }),
                action_archetype_id: "openEHR-EHR-ACTION.medication.v1".into(),
            }],
        })
    }

    #[test]
    fn composition_root_holds_content_under_a_named_key() {
        let encoded = encode(&composition(vec![evaluation(
            "openEHR-EHR-EVALUATION.problem_diagnosis.v1",
            "Problem",
        )]))
        .expect("encode");
        let document = Value::Object(encoded.document);

        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        assert_eq!(root["/$CLASS$"], json!(["Composition"]));
        let item = &root["/content[openEHR-EHR-EVALUATION.problem_diagnosis.v1]"][0];
        assert_eq!(item["/$CLASS$"], json!("Evaluation"));
        assert_eq!(item["/name"], json!([{"value": "Problem"}]));
        assert_eq!(
            item["/language"],
            json!({
                "_type": "CODE_PHRASE",
                "terminology_id": {"_type": "TERMINOLOGY_ID", "value": "ISO_639-1"},
                "code_string": "en"
            })
        );
        assert_eq!(
            item["/data[at0001]"]["/items[at0002]"][0]["/$PATH$"],
            json!("/content[openEHR-EHR-EVALUATION.problem_diagnosis.v1 and name/value='Problem']/data[at0001]/items[at0002]")
        );
        assert_eq!(document["/$CLASS$"], json!("Composition"));
        assert_eq!(document["/name"], json!([{"value": "Encounter"}]));
    }

    #[test]
    fn composition_class_is_forced_over_content_classes() {
        let encoded = encode(&composition(Vec::new())).expect("encode empty");
        let root = encoded
            .document
            .get("/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']")
            .expect("root key");
        assert_eq!(root, &json!({"/$CLASS$": ["Composition"]}));
    }

    #[test]
    fn missing_identity_is_fatal() {
        let err = encode(&composition(vec![evaluation("", "Problem")])).expect_err("no node id");
        assert!(matches!(err, CodecError::MissingArchetypeNodeId { ref class } if class == "Evaluation"));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let err = encode(&composition(vec![evaluation("openEHR-EHR-EVALUATION.x.v1", "  ")]))
            .expect_err("no name");
        assert!(matches!(err, CodecError::MissingName { .. }));
    }

    #[test]
    fn activity_without_description_is_fatal() {
        let err = encode(&composition(vec![instruction(None)])).expect_err("no description");
        assert!(matches!(
            err,
            CodecError::MissingActivityDescription { ref node_id } if node_id == "at0001"
        ));
    }

    #[test]
    fn instruction_folds_activities_into_its_map() {
        let encoded = encode(&composition(vec![instruction(Some(tree("at0002", "at0003")))]))
            .expect("encode");
        let document = Value::Object(encoded.document);
        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        let item = &root["/content[openEHR-EHR-INSTRUCTION.medication_order.v3]"][0];

        assert_eq!(item["/narrative"], json!({"_type": "DV_TEXT", "value": "Take daily"}));
        let activity = &item["/activities[at0001]"][0];
        assert_eq!(activity["/$CLASS$"], json!("Activity"));
        assert_eq!(
            activity["/timing"],
            json!({
                "/value": {"value": "R1/2024-01-01T08:00:00Z/P1D", "formalism": "timing"},
                "/$CLASS$": "DvParsable",
                "/$PATH$": "/content[openEHR-EHR-INSTRUCTION.medication_order.v3 and name/value='Order']/activities[at0001 and name/value='Order']/timing"
            })
        );
        assert_eq!(activity["/action_archetype_id"], json!("openEHR-EHR-ACTION.medication.v1"));
        assert_eq!(
            activity["/description[at0002]"]["/items[at0003]"][0]["/$PATH$"],
            json!("/content[openEHR-EHR-INSTRUCTION.medication_order.v3 and name/value='Order']/activities[at0001 and name/value='Order']/description[at0002]/items[at0003]")
        );
    }

    #[test]
    fn action_without_description_is_tolerated() {
        let action = ContentItem::Action(Action {
            locatable: Locatable::new("openEHR-EHR-ACTION.medication.v1", "Given"),
            entry: EntryAttributes::default(),
            guideline_id: None,
            protocol: None,
            time: DvDateTime::new("2024-01-01T08:00:00Z"),
            description: None,
            ism_transition: IsmTransition {
                current_state: DvCodedText {
                    value: "completed".into(),
                    defining_code: CodePhrase::new("openehr", "532"),
                    mappings: Vec::new(),
                },
                transition: None,
                careflow_step: None,
            },
            instruction_details: None,
        });

        let encoded = encode(&composition(vec![action])).expect("tolerated");
        let document = Value::Object(encoded.document);
        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        let item = &root["/content[openEHR-EHR-ACTION.medication.v1]"][0];
        assert_eq!(item["/$CLASS$"], json!("Action"));
        assert_eq!(item["/time"]["/value"]["epoch_offset"], json!(1704096000));
        assert_eq!(item["/time"]["/name"], json!([{"value": "Given"}]));
        assert_eq!(
            item["/time"]["/$PATH$"],
            json!("/content[openEHR-EHR-ACTION.medication.v1 and name/value='Given']/time")
        );
        assert_eq!(item["/ism_transition"]["current_state"]["value"], json!("completed"));
    }

    #[test]
    fn sections_nest_content_under_items() {
        let section = ContentItem::Section(Section {
            locatable: Locatable::new("openEHR-EHR-SECTION.adhoc.v1", "Findings"),
            items: vec![evaluation("openEHR-EHR-EVALUATION.problem_diagnosis.v1", "Problem")],
        });
        let encoded = encode(&composition(vec![section])).expect("encode");
        let document = Value::Object(encoded.document);
        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        let section = &root["/content[openEHR-EHR-SECTION.adhoc.v1]"][0];

        assert_eq!(section["/$CLASS$"], json!(["Section"]));
        assert_eq!(
            section["/items[openEHR-EHR-EVALUATION.problem_diagnosis.v1]"][0]["/$CLASS$"],
            json!("Evaluation")
        );
        assert_eq!(
            encoded.containment.get("openEHR_EHR_SECTION_adhoc_v1.openEHR_EHR_EVALUATION_problem_diagnosis_v1").map(String::as_str),
            Some("/content[openEHR-EHR-SECTION.adhoc.v1 and name/value='Findings']/items[openEHR-EHR-EVALUATION.problem_diagnosis.v1 and name/value='Problem']")
        );
    }

    #[test]
    fn containment_labels_are_deterministic() {
        let tree = composition(vec![
            evaluation("openEHR-EHR-EVALUATION.problem_diagnosis.v1", "Problem"),
            evaluation("openEHR-EHR-EVALUATION.alert.v1", "Alert"),
            evaluation("openEHR-EHR-EVALUATION.problem_diagnosis.v1", "Second problem"),
        ]);

        let first = encode(&tree).expect("first");
        let second = encode(&tree).expect("second");
        assert_eq!(
            serde_json::to_string(&first.containment).expect("serialise"),
            serde_json::to_string(&second.containment).expect("serialise")
        );
        assert_eq!(
            first.containment.keys().collect::<Vec<_>>(),
            vec![
                "openEHR_EHR_EVALUATION_alert_v1",
                "openEHR_EHR_EVALUATION_problem_diagnosis_v1",
            ]
        );
        assert_eq!(
            first.containment["openEHR_EHR_EVALUATION_problem_diagnosis_v1"],
            "/content[openEHR-EHR-EVALUATION.problem_diagnosis.v1 and name/value='Problem']"
        );
    }

    #[test]
    fn same_id_content_items_accumulate_under_one_key() {
        let encoded = encode(&composition(vec![
            evaluation("openEHR-EHR-EVALUATION.problem_diagnosis.v1", "First"),
            evaluation("openEHR-EHR-EVALUATION.problem_diagnosis.v1", "Second"),
        ]))
        .expect("encode");
        let document = Value::Object(encoded.document);
        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        let items = root["/content[openEHR-EHR-EVALUATION.problem_diagnosis.v1]"]
            .as_array()
            .expect("content list");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["/name"], json!([{"value": "Second"}]));
    }

    #[test]
    fn stand_alone_structure_records_its_identity() {
        let encoded = Encoder::new(&CodecConfig::default())
            .encode_item_structure(&tree("at0001", "at0002"))
            .expect("encode");
        assert_eq!(encoded.document.get("/archetype_node_id"), Some(&json!("at0001")));
        assert_eq!(encoded.document.get("/name"), Some(&json!([{"value": "Tree"}])));
        assert_eq!(
            encoded.document["/items[at0002]"][0]["/$PATH$"],
            json!("/items[at0002]")
        );
        assert!(encoded.containment.is_empty());
    }

    #[test]
    fn non_path_modes_key_nodes_by_id() {
        let config = CodecConfig::new(WalkerMode::Expanded, 8).expect("config");
        let encoded = Encoder::new(&config)
            .encode_composition(&composition(vec![evaluation(
                "openEHR-EHR-EVALUATION.problem_diagnosis.v1",
                "Problem",
            )]))
            .expect("encode");
        let document = Value::Object(encoded.document);
        let root = &document["/composition[openEHR-EHR-COMPOSITION.encounter.v1 and name/value='Encounter']"];
        let item = &root["openEHR-EHR-EVALUATION.problem_diagnosis.v1"][0];
        assert!(item.get("[language]").is_some());
        assert_eq!(
            item["at0001"]["at0002"][0]["/$PATH$"],
            json!("problem{{/content[openEHR-EHR-EVALUATION.problem_diagnosis.v1 and name/value='Problem']}}/tree{{/data[at0001]}}/")
        );
    }
}
