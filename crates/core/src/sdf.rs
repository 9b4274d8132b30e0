#![forbid(unsafe_code)]

//! Structured job payloads ("SDF documents") and the schema validation
//! contract they are checked against.
//!
//! The validator itself lives outside this crate. The core only knows that a
//! document either passes it or comes back with a [`SchemaError`].

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Rejection reported by a [`SchemaValidator`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct SchemaError {
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub trait SchemaValidator {
    fn validate(&self, document: &JsonMap<String, JsonValue>) -> Result<(), SchemaError>;
}

impl<F> SchemaValidator for F
where
    F: Fn(&JsonMap<String, JsonValue>) -> Result<(), SchemaError>,
{
    fn validate(&self, document: &JsonMap<String, JsonValue>) -> Result<(), SchemaError> {
        self(document)
    }
}

/// A payload that has passed schema validation.
///
/// [`SdfDocument::validate`] is the only public way to get one. Jobs read
/// back from the store reuse their stored payload without a second check.
///
/// ```compile_fail
/// let doc: kp_core::SdfDocument = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SdfDocument(JsonMap<String, JsonValue>);

impl SdfDocument {
    pub fn validate(
        document: JsonMap<String, JsonValue>,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, SchemaError> {
        validator.validate(&document)?;
        Ok(Self(document))
    }

    pub(crate) fn stored(document: JsonMap<String, JsonValue>) -> Self {
        Self(document)
    }

    pub fn as_map(&self) -> &JsonMap<String, JsonValue> {
        &self.0
    }
}
