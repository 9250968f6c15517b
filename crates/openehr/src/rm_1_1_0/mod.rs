//! openEHR Reference Model (RM) 1.1.0 record tree.
//!
//! This module implements the RM 1.1.0 classes a composition's content is built from, with
//! serde mappings that produce canonical openEHR JSON.

pub mod common;
pub mod composition;
pub mod data_structures;
