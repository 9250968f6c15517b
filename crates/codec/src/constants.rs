//! Keys and names of the flattened document format.
//!
//! Attribute keys start with `/`. Keys wrapped in `$` are synthetic: they carry information the
//! record tree holds structurally (the node class and its path) rather than an RM attribute.

/// Content items of a composition.
pub const TAG_CONTENT: &str = "/content";
/// Root key prefix of an encoded composition.
pub const TAG_COMPOSITION: &str = "/composition";
pub const TAG_PROTOCOL: &str = "/protocol";
pub const TAG_DATA: &str = "/data";
pub const TAG_STATE: &str = "/state";
pub const TAG_DESCRIPTION: &str = "/description";
pub const TAG_ITEMS: &str = "/items";
pub const TAG_ACTIVITIES: &str = "/activities";
pub const TAG_EVENTS: &str = "/events";
pub const TAG_SUMMARY: &str = "/summary";
pub const TAG_ORIGIN: &str = "/origin";
pub const TAG_TIME: &str = "/time";
pub const TAG_TIMING: &str = "/timing";
pub const TAG_WIDTH: &str = "/width";
pub const TAG_MATH_FUNCTION: &str = "/math_function";
pub const TAG_NARRATIVE: &str = "/narrative";
pub const TAG_ACTION_ARCHETYPE_ID: &str = "/action_archetype_id";
pub const TAG_ISM_TRANSITION: &str = "/ism_transition";
pub const TAG_LANGUAGE: &str = "/language";
pub const TAG_ENCODING: &str = "/encoding";
pub const TAG_SUBJECT: &str = "/subject";
pub const TAG_PROVIDER: &str = "/provider";
pub const TAG_OTHER_PARTICIPATIONS: &str = "/other_participations";
pub const TAG_WORKFLOW_ID: &str = "/workflow_id";
/// Guideline reference of a care entry.
pub const TAG_GUIDELINE_ID: &str = "/guideline_id";
/// Instruction activity an action was carried out for.
pub const TAG_INSTRUCTION_DETAILS: &str = "/instruction_details";

/// Value of an element, or the inner value of a time-like map.
pub const TAG_VALUE: &str = "/value";
pub const TAG_FORMALISM: &str = "/formalism";
pub const TAG_NULL_FLAVOUR: &str = "/null_flavour";
pub const TAG_NULL_REASON: &str = "/null_reason";

pub const TAG_NAME: &str = "/name";
pub const TAG_ARCHETYPE_NODE_ID: &str = "/archetype_node_id";
pub const TAG_ARCHETYPE_DETAILS: &str = "/archetype_details";
pub const TAG_UID: &str = "/uid";
pub const TAG_FEEDER_AUDIT: &str = "/feeder_audit";
pub const TAG_LINKS: &str = "/links";

/// Structural path of an element.
pub const TAG_PATH: &str = "/$PATH$";
/// Class tag of a node (`ItemTree`, `DvInterval<DvQuantity>`).
pub const TAG_CLASS: &str = "/$CLASS$";

/// Canonical JSON type discriminator.
pub const TYPE_FIELD: &str = "_type";
pub const ARCHETYPE_NODE_ID_FIELD: &str = "archetype_node_id";
pub const NAME_FIELD: &str = "name";
pub const VALUE_FIELD: &str = "value";
pub const FORMALISM_FIELD: &str = "formalism";
pub const DEFINING_CODE_FIELD: &str = "defining_code";
pub const MAPPINGS_FIELD: &str = "mappings";
pub const EPOCH_OFFSET_FIELD: &str = "epoch_offset";
pub const ITEMS_FIELD: &str = "items";
pub const ITEM_FIELD: &str = "item";
pub const ROWS_FIELD: &str = "rows";
pub const CONTENT_FIELD: &str = "content";
pub const EVENTS_FIELD: &str = "events";
pub const MULTIMEDIA_DATA_FIELD: &str = "data";

/// Opens the name predicate inside a path segment: `[at0001 and name/value='Systolic']`.
pub const NAME_PREDICATE: &str = " and name/value='";

/// Class tags that may surface as a type discriminator when stored as a plain string.
///
/// Data-value classes are excluded: an element's value map carries the class of its value,
/// and the element's own type comes from its path.
pub const STRUCTURAL_CLASSES: &[&str] = &[
    "Composition",
    "Section",
    "Observation",
    "Evaluation",
    "Instruction",
    "Activity",
    "Action",
    "AdminEntry",
    "GenericEntry",
    "History",
    "PointEvent",
    "IntervalEvent",
    "ItemTree",
    "ItemList",
    "ItemTable",
    "ItemSingle",
    "Cluster",
];

/// Environment variable naming the walker output mode.
pub const WALKER_MODE_ENV: &str = "VPR_WALKER_MODE";

/// Default decoder nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 64;
