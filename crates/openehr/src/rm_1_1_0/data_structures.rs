//! RM 1.1.0 data structures: item structures, items, histories and events.

use super::common::Locatable;
use crate::data_types::{
    from_tagged, required_tag, unknown_rm_type, DataValue, DvCodedText, DvDateTime, DvDuration,
    TextValue,
};
use crate::{Pathable, RmType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// RM `ELEMENT`: a leaf holding one data value, or a null flavour when the value is absent.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ELEMENT")]
pub struct Element {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_flavour: Option<DvCodedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_reason: Option<TextValue>,
}

/// RM `CLUSTER`: a named group of items.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "CLUSTER")]
pub struct Cluster {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

/// RM `ITEM`.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Element(Element),
    Cluster(Cluster),
}

/// RM `ITEM_SINGLE`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ITEM_SINGLE")]
pub struct ItemSingle {
    #[serde(flatten)]
    pub locatable: Locatable,
    pub item: Element,
}

/// RM `ITEM_LIST`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ITEM_LIST")]
pub struct ItemList {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Element>,
}

/// RM `ITEM_TREE`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ITEM_TREE")]
pub struct ItemTree {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

/// RM `ITEM_TABLE`: rows are clusters of cells.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "ITEM_TABLE")]
pub struct ItemTable {
    #[serde(flatten)]
    pub locatable: Locatable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Cluster>,
}

/// RM `ITEM_STRUCTURE`.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemStructure {
    Single(ItemSingle),
    List(ItemList),
    Tree(ItemTree),
    Table(ItemTable),
}

/// RM `HISTORY<ITEM_STRUCTURE>`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "HISTORY")]
pub struct History {
    #[serde(flatten)]
    pub locatable: Locatable,
    pub origin: DvDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ItemStructure>,
}

/// RM `POINT_EVENT`.
///
/// `data` is mandatory in the RM; it is optional here so partially built trees can still be
/// encoded.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "POINT_EVENT")]
pub struct PointEvent {
    #[serde(flatten)]
    pub locatable: Locatable,
    pub time: DvDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ItemStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ItemStructure>,
}

/// RM `INTERVAL_EVENT`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type", rename = "INTERVAL_EVENT")]
pub struct IntervalEvent {
    #[serde(flatten)]
    pub locatable: Locatable,
    pub time: DvDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ItemStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ItemStructure>,
    pub width: DvDuration,
    pub math_function: DvCodedText,
}

/// RM `EVENT`.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Point(PointEvent),
    Interval(IntervalEvent),
}

impl Event {
    pub fn time(&self) -> &DvDateTime {
        match self {
            Self::Point(e) => &e.time,
            Self::Interval(e) => &e.time,
        }
    }

    pub fn data(&self) -> Option<&ItemStructure> {
        match self {
            Self::Point(e) => e.data.as_ref(),
            Self::Interval(e) => e.data.as_ref(),
        }
    }

    pub fn state(&self) -> Option<&ItemStructure> {
        match self {
            Self::Point(e) => e.state.as_ref(),
            Self::Interval(e) => e.state.as_ref(),
        }
    }
}

impl ItemStructure {
    /// The child items in document order. A table yields its rows.
    pub fn items(&self) -> Vec<ItemRef<'_>> {
        match self {
            Self::Single(s) => vec![ItemRef::Element(&s.item)],
            Self::List(l) => l.items.iter().map(ItemRef::Element).collect(),
            Self::Tree(t) => t.items.iter().map(ItemRef::from).collect(),
            Self::Table(t) => t.rows.iter().map(ItemRef::Cluster).collect(),
        }
    }
}

/// Borrowed view of an item, so list elements and table rows can be walked like tree items.
#[derive(Clone, Copy, Debug)]
pub enum ItemRef<'a> {
    Element(&'a Element),
    Cluster(&'a Cluster),
}

impl<'a> From<&'a Item> for ItemRef<'a> {
    fn from(item: &'a Item) -> Self {
        match item {
            Item::Element(e) => Self::Element(e),
            Item::Cluster(c) => Self::Cluster(c),
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
    Element => "ELEMENT",
    Cluster => "CLUSTER",
    ItemSingle => "ITEM_SINGLE",
    ItemList => "ITEM_LIST",
    ItemTree => "ITEM_TREE",
    ItemTable => "ITEM_TABLE",
    History => "HISTORY",
    PointEvent => "POINT_EVENT",
    IntervalEvent => "INTERVAL_EVENT",
}

macro_rules! delegate_pathable {
    ($ty:ident { $($variant:ident),* }) => {
        impl RmType for $ty {
            fn rm_type(&self) -> &'static str {
                match self {
                    $(Self::$variant(inner) => inner.rm_type(),)*
                }
            }
        }

        impl Pathable for $ty {
            fn locatable(&self) -> &Locatable {
                match self {
                    $(Self::$variant(inner) => inner.locatable(),)*
                }
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $(Self::$variant(inner) => inner.serialize(serializer),)*
                }
            }
        }
    };
}

delegate_pathable!(Item { Element, Cluster });
delegate_pathable!(ItemStructure { Single, List, Tree, Table });
delegate_pathable!(Event { Point, Interval });

impl RmType for ItemRef<'_> {
    fn rm_type(&self) -> &'static str {
        match self {
            Self::Element(e) => e.rm_type(),
            Self::Cluster(c) => c.rm_type(),
        }
    }
}

impl Pathable for ItemRef<'_> {
    fn locatable(&self) -> &Locatable {
        match self {
            Self::Element(e) => e.locatable(),
            Self::Cluster(c) => c.locatable(),
        }
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match required_tag::<D::Error>(&value, "ITEM")?.as_str() {
            "ELEMENT" => Ok(Self::Element(from_tagged(value)?)),
            "CLUSTER" => Ok(Self::Cluster(from_tagged(value)?)),
            other => Err(unknown_rm_type(other, "ITEM")),
        }
    }
}

impl<'de> Deserialize<'de> for ItemStructure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match required_tag::<D::Error>(&value, "ITEM_STRUCTURE")?.as_str() {
            "ITEM_SINGLE" => Ok(Self::Single(from_tagged(value)?)),
            "ITEM_LIST" => Ok(Self::List(from_tagged(value)?)),
            "ITEM_TREE" => Ok(Self::Tree(from_tagged(value)?)),
            "ITEM_TABLE" => Ok(Self::Table(from_tagged(value)?)),
            other => Err(unknown_rm_type(other, "ITEM_STRUCTURE")),
        }
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match required_tag::<D::Error>(&value, "EVENT")?.as_str() {
            "POINT_EVENT" => Ok(Self::Point(from_tagged(value)?)),
            "INTERVAL_EVENT" => Ok(Self::Interval(from_tagged(value)?)),
            other => Err(unknown_rm_type(other, "EVENT")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::DvQuantity;
    use serde_json::json;

    #[test]
    fn element_flattens_locatable_attributes() {
        let element = Element {
            locatable: Locatable::new("at0004", "Systolic"),
            value: Some(DataValue::Quantity(DvQuantity {
                magnitude: 120.0,
                units: "mm[Hg]".into(),
                precision: None,
            })),
            null_flavour: None,
            null_reason: None,
        };
        let json = serde_json::to_value(&element).expect("serialise element");
        assert_eq!(
            json,
            json!({
                "_type": "ELEMENT",
                "archetype_node_id": "at0004",
                "name": {"_type": "DV_TEXT", "value": "Systolic"},
                "value": {"_type": "DV_QUANTITY", "magnitude": 120.0, "units": "mm[Hg]"}
            })
        );
        assert_eq!(element.class_name(), "Element");
    }

    #[test]
    fn item_structures_dispatch_on_type() {
        let json = json!({
            "_type": "ITEM_TREE",
            "archetype_node_id": "at0003",
            "name": {"_type": "DV_TEXT", "value": "Tree"},
            "items": [{
                "_type": "CLUSTER",
                "archetype_node_id": "at0010",
                "name": {"_type": "DV_TEXT", "value": "Device"},
                "items": [{
                    "_type": "ELEMENT",
                    "archetype_node_id": "at0011",
                    "name": {"_type": "DV_TEXT", "value": "Model"},
                    "value": {"_type": "DV_TEXT", "value": "X1"}
                }]
            }]
        });
        let structure: ItemStructure = serde_json::from_value(json.clone()).expect("parse tree");
        assert_eq!(structure.rm_type(), "ITEM_TREE");
        assert_eq!(structure.archetype_node_id(), "at0003");
        let items = structure.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].class_name(), "Cluster");
        assert_eq!(serde_json::to_value(&structure).expect("serialise"), json);
    }

    #[test]
    fn table_rows_are_walked_as_items() {
        let table = ItemStructure::Table(ItemTable {
            locatable: Locatable::new("at0001", "Table"),
            rows: vec![Cluster {
                locatable: Locatable::new("at0002", "Row"),
                items: Vec::new(),
            }],
        });
        let items = table.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].rm_type(), "CLUSTER");
    }
}
