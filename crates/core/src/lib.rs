#![forbid(unsafe_code)]

//! Job model for the job tracking store: identifiers, lifecycle status,
//! validated job values and the schema validation contract for payloads.

mod error;
pub mod ids;
pub mod job;
pub mod sdf;

pub use error::ValidationError;
pub use ids::{JobId, JobIdError};
pub use job::{JOB_FIELDS, Job, JobRecord, Status};
pub use sdf::{SchemaError, SchemaValidator, SdfDocument};
