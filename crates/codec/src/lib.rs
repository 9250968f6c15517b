//! VPR storage codec for openEHR compositions.
//!
//! A composition is stored as a flattened, path-keyed JSON document so that individual
//! elements can be indexed and queried by their archetype path. This crate converts between
//! the typed record tree from the `openehr` crate and that stored form.
//!
//! Responsibilities:
//! - [`Encoder`]: walk a record tree and produce its flattened document plus the containment
//!   labels of every node passed through.
//! - [`Decoder`]: rebuild canonical openEHR JSON (and from that, the record tree) from a
//!   flattened document.
//! - [`CodecConfig`]: the walker mode and decoder limits, resolved once at startup.
//!
//! Notes:
//! - Documents produced in [`WalkerMode::Path`] decode back to the JSON of the tree they were
//!   encoded from. The other modes are for name-based querying only.
//! - Siblings sharing one archetype node id inside a collection are grouped under one key, so
//!   their relative order is kept within the group but not across groups.

pub mod config;
pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod node_tag;
pub mod path;
pub mod path_stack;
pub mod tree;

pub use config::{walker_mode_from_env_value, CodecConfig, WalkerMode};
pub use decode::Decoder;
pub use encode::{EncodedDocument, Encoder};
pub use error::{CodecError, CodecResult, ErrorKind};

use openehr::Composition;
use serde_json::{Map, Value};

/// Encodes a composition with a fresh [`Encoder`].
///
/// # Errors
///
/// See [`Encoder::encode_composition`].
pub fn encode(composition: &Composition, config: &CodecConfig) -> CodecResult<EncodedDocument> {
    Encoder::new(config).encode_composition(composition)
}

/// Decodes a flattened document into canonical openEHR JSON.
///
/// # Errors
///
/// See [`Decoder::decode`].
pub fn decode(document: &Map<String, Value>, config: &CodecConfig) -> CodecResult<Map<String, Value>> {
    Decoder::new(config).decode(document)
}
