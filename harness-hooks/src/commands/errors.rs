//! Error taxonomy for hook runs.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookError>;

/// Failures a hook run can report. A policy block is not an error.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("[HH-1001] malformed input: {details}")]
    MalformedInput { details: String },

    #[error("[HH-1002] unrecognized {field} entry: {details}")]
    UnrecognizedShape {
        field: &'static str,
        details: String,
    },

    #[error("[HH-1003] {doc} has an unexpected shape and was left untouched: {details}")]
    ForeignDocument { doc: String, details: String },

    #[error("[HH-2001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[HH-2002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },
}

impl HookError {
    /// Stable machine-parseable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "HH-1001",
            Self::UnrecognizedShape { .. } => "HH-1002",
            Self::ForeignDocument { .. } => "HH-1003",
            Self::Io { .. } => "HH-2001",
            Self::Serialization { .. } => "HH-2002",
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(value: serde_json::Error) -> Self {
        if value.is_io() {
            return Self::Serialization {
                context: "json",
                details: value.to_string(),
            };
        }
        Self::MalformedInput {
            details: value.to_string(),
        }
    }
}
