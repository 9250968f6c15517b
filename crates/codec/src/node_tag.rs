//! Keys for nodes and element paths, per walker mode.

use crate::config::WalkerMode;
use crate::constants::{TAG_ACTIVITIES, TAG_DESCRIPTION, TAG_EVENTS, TAG_ITEMS};
use crate::path::node_key;
use crate::path_stack::PathStack;
use crate::tree::Container;
use openehr::{ArchetypeId, Pathable};

/// Computes the key a node is stored under in its parent container.
#[derive(Clone, Copy, Debug)]
pub struct NodeTagger {
    mode: WalkerMode,
}

impl NodeTagger {
    pub fn new(mode: WalkerMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WalkerMode {
        self.mode
    }

    /// The key for `node` under `attribute` in a container of kind `container`.
    ///
    /// In path mode a node key is `attribute[node_id]`. A unique container cannot hold two
    /// siblings under one key, so there the key also gets a name predicate when the node is an
    /// archetype slot or a collection member (anything but a description). Multi containers
    /// group same-id siblings under one key instead.
    ///
    /// Without a node (an attribute holding a plain value, such as `/origin`), path mode uses
    /// the attribute itself and the other modes use the bracketed attribute name.
    pub fn tag(&self, attribute: &str, node: Option<&dyn Pathable>, container: Container) -> String {
        match (self.mode, node) {
            (WalkerMode::Path, None) => attribute.to_owned(),
            (WalkerMode::Path, Some(node)) => {
                let node_id = node.archetype_node_id();
                let disambiguate = container == Container::Unique
                    && !attribute.starts_with(TAG_DESCRIPTION)
                    && (ArchetypeId::is_archetype_id(node_id)
                        || matches!(attribute, TAG_ACTIVITIES | TAG_ITEMS | TAG_EVENTS));
                let name = disambiguate.then(|| node.name().value());
                node_key(attribute, node_id, name)
            }
            (_, None) => format!("[{}]", attribute.trim_start_matches('/')),
            (_, Some(node)) => node.archetype_node_id().to_owned(),
        }
    }

    /// The structural path recorded on an element, or `None` in raw mode.
    pub fn element_path(&self, stack: &PathStack) -> Option<String> {
        match self.mode {
            WalkerMode::Path => Some(stack.path_dump()),
            WalkerMode::Named => Some(stack.named_dump()),
            WalkerMode::Expanded => Some(stack.expanded_dump()),
            WalkerMode::Raw => None,
        }
    }

    /// The path recorded on a time-like attribute of the current node (`/origin`, `/time`).
    ///
    /// Path mode appends the attribute key; the named modes append it without its leading `/`.
    pub fn attribute_path(&self, stack: &PathStack, attribute: &str) -> Option<String> {
        let base = self.element_path(stack)?;
        match self.mode {
            WalkerMode::Path => Some(format!("{base}{attribute}")),
            _ => Some(format!("{base}{}", attribute.trim_start_matches('/'))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openehr::rm_1_1_0::data_structures::{Cluster, Element};
    use openehr::Locatable;

    fn element(id: &str, name: &str) -> Element {
        Element {
            locatable: Locatable::new(id, name),
            value: None,
            null_flavour: None,
            null_reason: None,
        }
    }

    #[test]
    fn path_mode_adds_name_predicate_only_in_unique_containers() {
        let tagger = NodeTagger::new(WalkerMode::Path);
        let node = element("at0004", "Systolic");

        assert_eq!(
            tagger.tag("/items", Some(&node), Container::Unique),
            "/items[at0004 and name/value='Systolic']"
        );
        assert_eq!(tagger.tag("/items", Some(&node), Container::Multi), "/items[at0004]");
        assert_eq!(tagger.tag("/data", Some(&node), Container::Unique), "/data[at0004]");
        assert_eq!(tagger.tag("/origin", None, Container::Unique), "/origin");
    }

    #[test]
    fn archetype_slots_are_disambiguated_except_under_description() {
        let tagger = NodeTagger::new(WalkerMode::Path);
        let slot = Cluster {
            locatable: Locatable::new("openEHR-EHR-CLUSTER.device.v1", "Cuff"),
            items: Vec::new(),
        };

        assert_eq!(
            tagger.tag("/protocol", Some(&slot), Container::Unique),
            "/protocol[openEHR-EHR-CLUSTER.device.v1 and name/value='Cuff']"
        );
        assert_eq!(
            tagger.tag("/description", Some(&slot), Container::Unique),
            "/description[openEHR-EHR-CLUSTER.device.v1]"
        );
    }

    #[test]
    fn other_modes_key_by_node_id() {
        let node = element("at0004", "Systolic");
        for mode in [WalkerMode::Named, WalkerMode::Expanded, WalkerMode::Raw] {
            let tagger = NodeTagger::new(mode);
            assert_eq!(tagger.tag("/items", Some(&node), Container::Unique), "at0004");
            assert_eq!(tagger.tag("/origin", None, Container::Unique), "[origin]");
            assert_eq!(tagger.tag("/events", None, Container::Unique), "[events]");
        }
    }

    #[test]
    fn element_path_follows_mode() {
        let mut stack = PathStack::new();
        stack.push("/data", "at0001", Some("Tree Data"));
        stack.push("/items", "at0004", None);

        assert_eq!(
            NodeTagger::new(WalkerMode::Path).element_path(&stack).as_deref(),
            Some("/data[at0001]/items[at0004]")
        );
        assert_eq!(
            NodeTagger::new(WalkerMode::Named).element_path(&stack).as_deref(),
            Some("tree_data/")
        );
        assert_eq!(
            NodeTagger::new(WalkerMode::Expanded).element_path(&stack).as_deref(),
            Some("tree_data{{/data[at0001]}}/")
        );
        assert_eq!(NodeTagger::new(WalkerMode::Raw).element_path(&stack), None);
    }

    #[test]
    fn attribute_path_appends_the_attribute() {
        let mut stack = PathStack::new();
        stack.push("/data", "at0001", Some("History"));

        assert_eq!(
            NodeTagger::new(WalkerMode::Path)
                .attribute_path(&stack, "/origin")
                .as_deref(),
            Some("/data[at0001]/origin")
        );
        assert_eq!(
            NodeTagger::new(WalkerMode::Named)
                .attribute_path(&stack, "/origin")
                .as_deref(),
            Some("history/origin")
        );
        assert_eq!(
            NodeTagger::new(WalkerMode::Raw).attribute_path(&stack, "/origin"),
            None
        );
    }
}
