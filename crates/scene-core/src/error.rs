//! Error types for label value conversion and schema validation.

use thiserror::Error;

/// A label value could not be read as a set of formation names.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelValueError {
    #[error("label value must be a list, got {0}")]
    NotAList(String),

    #[error("label value list must contain only strings, got {0}")]
    NonStringElement(String),
}

/// A formation schema is malformed, or a value does not satisfy it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("malformed formation schema: {0}")]
    Malformed(String),

    #[error("invalid formation name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("formation {0:?} is not allowed by the schema")]
    NotAllowed(String),

    #[error("expected at least {min} formations, got {got}")]
    TooFewItems { min: usize, got: usize },

    #[error("formation {0:?} is listed more than once")]
    DuplicateItem(String),

    #[error(transparent)]
    Value(#[from] LabelValueError),
}
