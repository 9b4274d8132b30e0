#![forbid(unsafe_code)]

use crate::ids::JobIdError;
use crate::sdf::SchemaError;

/// A candidate job was rejected. Construction is all-or-nothing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("job specification must be a JSON object")]
    NotAnObject,
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid status `{0}` (expected pending, running, failed or completed)")]
    InvalidStatus(String),
    #[error("field `{field}` must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field `{field}` is not a valid job id: {source}")]
    InvalidJobId {
        field: &'static str,
        source: JobIdError,
    },
    #[error("field `{field}` is not an RFC 3339 timestamp: {reason}")]
    InvalidTimestamp { field: &'static str, reason: String },
    #[error("sdf_data failed schema validation: {0}")]
    Schema(#[from] SchemaError),
}
