//! Encoding of item structures, items, histories and events.

use super::attributes::{
    canonical, data_value_json, finish_node, identity, insert_locatable, time_map, value_class,
};
use super::Encoder;
use crate::constants::{
    TAG_ARCHETYPE_NODE_ID, TAG_CLASS, TAG_DATA, TAG_EVENTS, TAG_ITEMS, TAG_MATH_FUNCTION,
    TAG_NULL_FLAVOUR, TAG_NULL_REASON, TAG_ORIGIN, TAG_PATH, TAG_STATE, TAG_SUMMARY, TAG_TIME,
    TAG_VALUE, TAG_WIDTH,
};
use crate::path_stack::StackFrame;
use crate::tree::{
    compact_entry, ensure_class, force_class, insert, insert_name, Container, MultiMap, PathMap,
    Tree,
};
use crate::CodecResult;
use openehr::rm_1_1_0::data_structures::{Cluster, Element, Event, History, ItemRef};
use openehr::{ItemStructure, Pathable, RmType};
use serde_json::Value;

const CLUSTER_CLASS: &str = "Cluster";

impl Encoder {
    /// Encode an item structure.
    ///
    /// With `attribute` given the structure is entered as a node under that attribute. A root
    /// structure, or one whose frame the caller already pushed, passes `None`.
    pub(crate) fn encode_structure(
        &mut self,
        attribute: Option<&str>,
        structure: &ItemStructure,
    ) -> CodecResult<PathMap> {
        let (node_id, name) = identity(structure)?;
        match attribute {
            Some(attribute) => {
                let mut frame = StackFrame::enter(self, attribute, node_id, Some(name));
                frame.structure_body(structure)
            }
            None => self.structure_body(structure),
        }
    }

    fn structure_body(&mut self, structure: &ItemStructure) -> CodecResult<PathMap> {
        let class = structure.class_name();
        if let ItemStructure::Single(single) = structure {
            let mut map = PathMap::new();
            let key = self
                .tagger
                .tag(TAG_ITEMS, Some(&single.item), Container::Unique);
            let entry = self.encode_element(&single.item)?;
            compact_entry(&mut map, key, entry, &class)?;
            force_class(&mut map, &class);
            finish_node(&mut map, structure)?;
            return Ok(map);
        }

        let mut items = MultiMap::new();
        for item in structure.items() {
            let key = self.tagger.tag(TAG_ITEMS, Some(&item), Container::Multi);
            let entry = self.encode_item(item)?;
            compact_entry(&mut items, key, entry, &item.class_name())?;
        }
        force_class(&mut items, &class);
        finish_node(&mut items, structure)?;
        Ok(items.fix_locatable_attributes())
    }

    fn encode_item(&mut self, item: ItemRef<'_>) -> CodecResult<PathMap> {
        match item {
            ItemRef::Element(element) => self.encode_element(element),
            ItemRef::Cluster(cluster) => self.encode_cluster(cluster),
        }
    }

    /// Encode an element as `{"/value": valueMap}`, ready for compaction by the parent.
    fn encode_element(&mut self, element: &Element) -> CodecResult<PathMap> {
        let (node_id, _) = identity(element)?;
        let frame = StackFrame::enter(self, TAG_ITEMS, node_id, None);
        let value_map = frame.element_value_map(element)?;
        drop(frame);

        let mut entry = PathMap::new();
        entry.put(TAG_VALUE.to_owned(), value_map.into_value());
        Ok(entry)
    }

    fn element_value_map(&self, element: &Element) -> CodecResult<PathMap> {
        let mut map = PathMap::new();
        if let Some(value) = &element.value {
            map.put(TAG_VALUE.to_owned(), data_value_json(value)?);
            map.put(TAG_CLASS.to_owned(), Value::String(value_class(value)?));
        }
        if let Some(null_flavour) = &element.null_flavour {
            map.put(TAG_NULL_FLAVOUR.to_owned(), canonical(null_flavour)?);
        }
        if let Some(null_reason) = &element.null_reason {
            map.put(TAG_NULL_REASON.to_owned(), canonical(null_reason)?);
        }
        insert_locatable(&mut map, &element.locatable)?;
        insert_name(&mut map, element.name())?;
        if let Some(path) = self.tagger.element_path(&self.stack) {
            map.put(TAG_PATH.to_owned(), Value::String(path));
        }
        map.put(
            TAG_ARCHETYPE_NODE_ID.to_owned(),
            Value::String(element.archetype_node_id().to_owned()),
        );
        Ok(map)
    }

    fn encode_cluster(&mut self, cluster: &Cluster) -> CodecResult<PathMap> {
        let (node_id, name) = identity(cluster)?;
        let mut frame = StackFrame::enter(self, TAG_ITEMS, node_id, Some(name));
        frame.cluster_body(cluster)
    }

    fn cluster_body(&mut self, cluster: &Cluster) -> CodecResult<PathMap> {
        let mut items = MultiMap::new();
        for item in cluster.items.iter().map(ItemRef::from) {
            let key = self.tagger.tag(TAG_ITEMS, Some(&item), Container::Multi);
            let nested_cluster = matches!(item, ItemRef::Cluster(_));
            let mut entry = self.encode_item(item)?;
            // A nested cluster stores its class as a plain string, not a list.
            if nested_cluster {
                force_class(&mut entry, CLUSTER_CLASS);
            }
            compact_entry(&mut items, key, entry, CLUSTER_CLASS)?;
        }
        ensure_class(&mut items, CLUSTER_CLASS);
        finish_node(&mut items, cluster)?;
        Ok(items.fix_locatable_attributes())
    }

    /// Encode the history under `attribute` (`/data` or `/state` of an observation).
    pub(crate) fn encode_history(
        &mut self,
        attribute: &str,
        history: &History,
    ) -> CodecResult<PathMap> {
        let (node_id, name) = identity(history)?;
        let mut frame = StackFrame::enter(self, attribute, node_id, Some(name));
        frame.history_body(history)
    }

    fn history_body(&mut self, history: &History) -> CodecResult<PathMap> {
        let class = history.class_name();
        let mut map = PathMap::new();
        insert(
            &mut map,
            Some(history),
            self.attribute_key(TAG_ORIGIN),
            self.time_like_value(time_map(&history.origin), TAG_ORIGIN, Some(history.name()))?,
            Some(&class),
        )?;

        if let Some(summary) = &history.summary {
            let key = self.tagger.tag(TAG_SUMMARY, Some(summary), Container::Unique);
            let encoded = self.encode_structure(Some(TAG_SUMMARY), summary)?;
            insert(&mut map, Some(history), key, encoded.into_value(), Some(&class))?;
        }

        let mut events = MultiMap::new();
        for event in &history.events {
            let key = self.tagger.tag(TAG_EVENTS, Some(event), Container::Multi);
            let encoded = self.encode_event(event)?;
            events.put(key, encoded.into_value());
        }
        insert(
            &mut map,
            Some(history),
            self.attribute_key(TAG_EVENTS),
            events.into_value(),
            Some(&class),
        )?;

        finish_node(&mut map, history)?;
        Ok(map)
    }

    fn encode_event(&mut self, event: &Event) -> CodecResult<PathMap> {
        let (node_id, name) = identity(event)?;
        let mut frame = StackFrame::enter(self, TAG_EVENTS, node_id, Some(name));
        frame.event_body(event)
    }

    fn event_body(&mut self, event: &Event) -> CodecResult<PathMap> {
        let class = event.class_name();
        let mut map = PathMap::new();
        insert(
            &mut map,
            Some(event),
            self.attribute_key(TAG_TIME),
            self.time_like_value(time_map(event.time()), TAG_TIME, Some(event.name()))?,
            None,
        )?;

        for (attribute, structure) in [(TAG_DATA, event.data()), (TAG_STATE, event.state())] {
            let Some(structure) = structure else {
                continue;
            };
            let key = self.tagger.tag(attribute, Some(structure), Container::Unique);
            let encoded = self.encode_structure(Some(attribute), structure)?;
            insert(&mut map, Some(event), key, encoded.into_value(), Some(&class))?;
        }

        if let Event::Interval(interval) = event {
            insert(
                &mut map,
                Some(event),
                self.attribute_key(TAG_WIDTH),
                canonical(&interval.width)?,
                None,
            )?;
            insert(
                &mut map,
                Some(event),
                self.attribute_key(TAG_MATH_FUNCTION),
                canonical(&interval.math_function)?,
                None,
            )?;
        }

        if !map.contains_key(TAG_CLASS) {
            tracing::warn!(
                path = %self.stack.path_dump(),
                class = %class,
                "event has no data or state, stamping its class"
            );
            ensure_class(&mut map, &class);
        }
        finish_node(&mut map, event)?;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CodecConfig, WalkerMode};
    use crate::encode::Encoder;
    use crate::tree::Tree;
    use openehr::data_types::{DvCount, DvDateTime, DvQuantity, DvText};
    use openehr::rm_1_1_0::data_structures::{
        Cluster, Element, Event, History, Item, ItemSingle, ItemTable, ItemTree, PointEvent,
    };
    use openehr::{DataValue, ItemStructure, Locatable};
    use serde_json::json;

    fn encoder() -> Encoder {
        Encoder::new(&CodecConfig::default())
    }

    fn element(id: &str, name: &str, magnitude: i64) -> Element {
        Element {
            locatable: Locatable::new(id, name),
            value: Some(DataValue::Count(DvCount { magnitude })),
            null_flavour: None,
            null_reason: None,
        }
    }

    #[test]
    fn single_structure_compacts_its_element_to_a_value_map() {
        let single = ItemStructure::Single(ItemSingle {
            locatable: Locatable::new("at0001", "Single"),
            item: element("at0002", "Count", 3),
        });

        let map = encoder()
            .encode_structure(None, &single)
            .expect("encode single");

        assert_eq!(
            map.into_value(),
            json!({
                "/items[at0002 and name/value='Count']": {
                    "/value": {"magnitude": 3},
                    "/$CLASS$": "DvCount",
                    "/name": [{"value": "Count"}],
                    "/$PATH$": "/items[at0002]",
                    "/archetype_node_id": "at0002"
                },
                "/$CLASS$": "ItemSingle",
                "/name": [{"value": "Single"}]
            })
        );
    }

    #[test]
    fn cluster_children_keep_element_class_and_nested_clusters_read_as_cluster() {
        let inner = Cluster {
            locatable: Locatable::new("at0020", "Inner"),
            items: vec![Item::Element(element("at0021", "Leaf", 1))],
        };
        let tree = ItemStructure::Tree(ItemTree {
            locatable: Locatable::new("at0001", "Tree"),
            items: vec![Item::Cluster(Cluster {
                locatable: Locatable::new("at0010", "Outer"),
                items: vec![
                    Item::Element(element("at0011", "Count", 2)),
                    Item::Cluster(inner),
                ],
            })],
        });

        let map = encoder()
            .encode_structure(Some("/data"), &tree)
            .expect("encode tree")
            .into_value();

        let outer = &map["/items[at0010]"][0];
        assert_eq!(outer["/$CLASS$"], json!(["Cluster"]));
        assert_eq!(outer["/items[at0011]"][0]["/$CLASS$"], json!("DvCount"));
        assert_eq!(
            outer["/items[at0011]"][0]["/$PATH$"],
            json!("/data[at0001]/items[at0010 and name/value='Outer']/items[at0011]")
        );
        assert_eq!(outer["/items[at0020]"][0]["/$CLASS$"], json!("Cluster"));
        assert_eq!(
            outer["/items[at0020]"][0]["/items[at0021]"][0]["/$CLASS$"],
            json!("DvCount")
        );
        assert_eq!(map["/$CLASS$"], json!(["ItemTree"]));
        assert_eq!(map["/name"], json!([{"value": "Tree"}]));
    }

    #[test]
    fn table_rows_are_stored_as_items() {
        let table = ItemStructure::Table(ItemTable {
            locatable: Locatable::new("at0001", "Table"),
            rows: vec![Cluster {
                locatable: Locatable::new("at0002", "Row"),
                items: vec![Item::Element(element("at0003", "Cell", 7))],
            }],
        });

        let map = encoder()
            .encode_structure(None, &table)
            .expect("encode table")
            .into_value();

        assert_eq!(map["/$CLASS$"], json!(["ItemTable"]));
        assert_eq!(map["/items[at0002]"][0]["/items[at0003]"][0]["/value"], json!({"magnitude": 7}));
    }

    #[test]
    fn empty_structures_are_still_emitted() {
        let tree = ItemStructure::Tree(ItemTree {
            locatable: Locatable::new("at0001", "Empty"),
            items: Vec::new(),
        });
        let map = encoder().encode_structure(None, &tree).expect("encode");
        assert_eq!(
            map.into_value(),
            json!({"/$CLASS$": ["ItemTree"], "/name": [{"value": "Empty"}]})
        );
    }

    #[test]
    fn element_paths_follow_walker_mode() {
        let tree = ItemStructure::Tree(ItemTree {
            locatable: Locatable::new("at0001", "Tree Data"),
            items: vec![Item::Element(Element {
                locatable: Locatable::new("at0004", "Comment"),
                value: Some(DataValue::Text(DvText {
                    value: "ok".into(),
                })),
                null_flavour: None,
                null_reason: None,
            })],
        });

        let raw = Encoder::new(&CodecConfig::new(WalkerMode::Raw, 8).expect("config"))
            .encode_structure(Some("/data"), &tree)
            .expect("encode raw")
            .into_value();
        assert_eq!(raw["at0004"][0].get("/$PATH$"), None);

        let named = Encoder::new(&CodecConfig::new(WalkerMode::Named, 8).expect("config"))
            .encode_structure(Some("/data"), &tree)
            .expect("encode named")
            .into_value();
        assert_eq!(named["at0004"][0]["/$PATH$"], json!("tree_data/"));
    }

    #[test]
    fn history_nests_events_and_time_maps() {
        let history = History {
            locatable: Locatable::new("at0001", "History"),
            origin: DvDateTime::new("2024-01-01T10:00:00Z"),
            events: vec![Event::Point(PointEvent {
                locatable: Locatable::new("at0002", "Any event"),
                time: DvDateTime::new("2024-01-01T10:05:00Z"),
                data: Some(ItemStructure::Tree(ItemTree {
                    locatable: Locatable::new("at0003", "Tree"),
                    items: vec![Item::Element(Element {
                        locatable: Locatable::new("at0004", "Systolic"),
                        value: Some(DataValue::Quantity(DvQuantity {
                            magnitude: 120.0,
                            units: "mm[Hg]".into(),
                            precision: None,
                        })),
                        null_flavour: None,
                        null_reason: None,
                    })],
                })),
                state: None,
            })],
            summary: None,
        };

        let mut encoder = encoder();
        let map = encoder
            .encode_history("/data", &history)
            .expect("encode history")
            .into_value();
        assert_eq!(encoder.stack.depth(), 0);

        assert_eq!(map["/$CLASS$"], json!("History"));
        assert_eq!(map["/origin"]["/value"]["epoch_offset"], json!(1704103200));
        assert_eq!(map["/origin"]["/name"], json!([{"value": "History"}]));
        assert_eq!(map["/origin"]["/$PATH$"], json!("/data[at0001]/origin"));
        let event = &map["/events"]["/events[at0002]"][0];
        assert_eq!(event["/$CLASS$"], json!("PointEvent"));
        assert_eq!(event["/name"], json!([{"value": "Any event"}]));
        assert_eq!(
            event["/data[at0003]"]["/items[at0004]"][0]["/$PATH$"],
            json!("/data[at0001]/events[at0002 and name/value='Any event']/data[at0003]/items[at0004]")
        );
    }

    #[test]
    fn event_without_data_is_stamped_with_its_class() {
        let event = Event::Point(PointEvent {
            locatable: Locatable::new("at0002", "Any event"),
            time: DvDateTime::new("2024-01-01T10:05:00Z"),
            data: None,
            state: None,
        });

        let map = encoder().encode_event(&event).expect("encode event");
        assert_eq!(map.get("/$CLASS$"), Some(&json!("PointEvent")));
        assert_eq!(map.get("/name"), Some(&json!([{"value": "Any event"}])));
    }
}
