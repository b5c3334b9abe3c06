//! Error types for API comparison

use thiserror::Error;

/// Result type for comparison operations
pub type Result<T> = std::result::Result<T, CompareError>;

/// Fatal comparison errors.
///
/// Data mismatches between two APIs are never errors; they are reported as
/// problem strings. These variants cover the cases where no meaningful report
/// can be produced at all.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Type missing from registry: {type_name}")]
    UnknownType { type_name: String },

    #[error("Supertype chain of {type_name} loops back on itself")]
    SupertypeCycle { type_name: String },

    #[error("Invalid API descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
