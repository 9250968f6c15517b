//! Codec runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the encoder and
//! decoder. Neither reads environment variables while working on a document.

use crate::constants::DEFAULT_MAX_DEPTH;
use crate::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

/// How the encoder spells node keys and element paths.
///
/// Only [`WalkerMode::Path`] output can be decoded back into a record tree; the other modes
/// produce documents for name-based querying and inspection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkerMode {
    /// `attribute[node_id]` keys with name predicates where needed, full structural paths.
    #[default]
    Path,
    /// Node-id keys, element paths built from lower-cased node names.
    Named,
    /// Node-id keys, element paths pairing each name with its path segment.
    Expanded,
    /// Node-id keys, no element paths.
    Raw,
}

impl FromStr for WalkerMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "named" => Ok(Self::Named),
            "expanded" => Ok(Self::Expanded),
            "raw" => Ok(Self::Raw),
            _ => Err(CodecError::UnknownWalkerMode(s.to_owned())),
        }
    }
}

impl fmt::Display for WalkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::Named => "named",
            Self::Expanded => "expanded",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Codec configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CodecConfig {
    walker_mode: WalkerMode,
    max_depth: usize,
}

impl CodecConfig {
    /// Create a new `CodecConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if `max_depth` is zero.
    pub fn new(walker_mode: WalkerMode, max_depth: usize) -> CodecResult<Self> {
        if max_depth == 0 {
            return Err(CodecError::InvalidConfig(
                "max_depth must be greater than zero".into(),
            ));
        }
        Ok(Self {
            walker_mode,
            max_depth,
        })
    }

    pub fn walker_mode(&self) -> WalkerMode {
        self.walker_mode
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            walker_mode: WalkerMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Resolve the walker mode from an optional environment value.
///
/// Callers read [`crate::constants::WALKER_MODE_ENV`] at startup and pass the result in. An absent or blank
/// value selects [`WalkerMode::Path`].
///
/// # Errors
///
/// Returns [`CodecError::UnknownWalkerMode`] if the value names no mode.
pub fn walker_mode_from_env_value(value: Option<String>) -> CodecResult<WalkerMode> {
    match value {
        Some(v) if !v.trim().is_empty() => v.parse(),
        _ => Ok(WalkerMode::default()),
    }
}
