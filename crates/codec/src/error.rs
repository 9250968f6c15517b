//! Codec error types.

/// Broad classes of codec failure.
///
/// Malformed input is the caller's record tree breaking an RM invariant the encoding relies
/// on. Internal consistency failures mean a flattened document (or the codec's own
/// configuration) does not have a shape this codec produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    InternalConsistency,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{class} node has no archetype node id")]
    MissingArchetypeNodeId { class: String },

    #[error("{class} node '{node_id}' has no name")]
    MissingName { class: String, node_id: String },

    #[error("activity '{node_id}' has no description")]
    MissingActivityDescription { node_id: String },

    #[error("interval bounds disagree: lower is {lower}, upper is {upper}")]
    IntervalTypeMismatch { lower: String, upper: String },

    #[error("record tree error: {0}")]
    Openehr(#[from] openehr::OpenEhrError),

    #[error("unsupported value at '{key}': {detail}")]
    UnsupportedValue { key: String, detail: String },

    #[error("composition content has unexpected keys: {0:?}")]
    InconsistentContent(Vec<String>),

    #[error("unknown walker mode '{0}'")]
    UnknownWalkerMode(String),

    #[error("document has no {} root", crate::constants::TAG_COMPOSITION)]
    MissingCompositionRoot,

    #[error("document nests deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to serialise record value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingArchetypeNodeId { .. }
            | Self::MissingName { .. }
            | Self::MissingActivityDescription { .. }
            | Self::IntervalTypeMismatch { .. }
            | Self::Openehr(_) => ErrorKind::MalformedInput,
            Self::UnsupportedValue { .. }
            | Self::InconsistentContent(_)
            | Self::UnknownWalkerMode(_)
            | Self::MissingCompositionRoot
            | Self::NestingTooDeep(_)
            | Self::InvalidConfig(_)
            | Self::Serialization(_) => ErrorKind::InternalConsistency,
        }
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
