#![forbid(unsafe_code)]

use crate::error::ValidationError;
use crate::ids::JobId;
use crate::sdf::{SchemaValidator, SdfDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Every field name a job specification may carry.
pub const JOB_FIELDS: &[&str] = &[
    "title",
    "raw_title",
    "description",
    "status",
    "parent",
    "sdf_data",
    "generated_for",
    "error_message",
    "last_updated",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Failed,
    Completed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Running,
        Status::Failed,
        Status::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Failed => "failed",
            Status::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| ValidationError::InvalidStatus(raw.to_string()))
    }
}

/// One tracked unit of work.
///
/// Build it from caller input with [`Job::construct`]; every path that takes
/// untyped fields goes through the same checks. `last_updated` belongs to the
/// store and is overwritten on every write.
///
/// There is no `Deserialize`: a payload cannot skip the validator by being
/// decoded straight into a job.
///
/// ```compile_fail
/// let job: kp_core::Job = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Job {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_title: Option<String>,
    pub description: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdf_data: Option<SdfDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        serialize_with = "time::serde::rfc3339::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<OffsetDateTime>,
}

/// Persisted shape of a [`Job`]. Only reachable through [`Job::from_stored`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredJob {
    title: String,
    #[serde(default)]
    raw_title: Option<String>,
    description: String,
    status: Status,
    #[serde(default)]
    parent: Option<JobId>,
    #[serde(default)]
    sdf_data: Option<JsonMap<String, JsonValue>>,
    #[serde(default)]
    generated_for: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_updated: Option<OffsetDateTime>,
}

impl From<StoredJob> for Job {
    fn from(stored: StoredJob) -> Self {
        Self {
            title: stored.title,
            raw_title: stored.raw_title,
            description: stored.description,
            status: stored.status,
            parent: stored.parent,
            sdf_data: stored.sdf_data.map(SdfDocument::stored),
            generated_for: stored.generated_for,
            error_message: stored.error_message,
            last_updated: stored.last_updated,
        }
    }
}

impl Job {
    pub fn new(title: impl Into<String>, description: impl Into<String>, status: Status) -> Self {
        Self {
            title: title.into(),
            raw_title: None,
            description: description.into(),
            status,
            parent: None,
            sdf_data: None,
            generated_for: None,
            error_message: None,
            last_updated: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent: Option<JobId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_sdf_data(mut self, sdf_data: Option<SdfDocument>) -> Self {
        self.sdf_data = sdf_data;
        self
    }

    pub fn construct(
        mut fields: JsonMap<String, JsonValue>,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, ValidationError> {
        // Unknown keys win over every other failure so rejections are stable.
        if let Some(unknown) = fields.keys().find(|k| !JOB_FIELDS.contains(&k.as_str())) {
            return Err(ValidationError::UnknownField(unknown.clone()));
        }

        let title = required_string(&mut fields, "title")?;
        let description = required_string(&mut fields, "description")?;
        let status = required_status(&mut fields)?;
        let raw_title = optional_string(&mut fields, "raw_title")?;
        let parent = optional_job_id(&mut fields, "parent")?;
        let generated_for = optional_string(&mut fields, "generated_for")?;
        let error_message = optional_string(&mut fields, "error_message")?;
        let last_updated = optional_timestamp(&mut fields, "last_updated")?;
        let sdf_data = optional_document(&mut fields, "sdf_data", validator)?;

        Ok(Self {
            title,
            raw_title,
            description,
            status,
            parent,
            sdf_data,
            generated_for,
            error_message,
            last_updated,
        })
    }

    pub fn from_json(
        value: JsonValue,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, ValidationError> {
        match value {
            JsonValue::Object(fields) => Self::construct(fields, validator),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Renders the job as the field mapping [`Job::construct`] accepts.
    /// Absent optionals are left out.
    pub fn to_fields(&self) -> Result<JsonMap<String, JsonValue>, ValidationError> {
        let mut fields = JsonMap::new();
        fields.insert("title".into(), JsonValue::String(self.title.clone()));
        if let Some(raw_title) = &self.raw_title {
            fields.insert("raw_title".into(), JsonValue::String(raw_title.clone()));
        }
        fields.insert(
            "description".into(),
            JsonValue::String(self.description.clone()),
        );
        fields.insert(
            "status".into(),
            JsonValue::String(self.status.as_str().to_string()),
        );
        if let Some(parent) = &self.parent {
            fields.insert("parent".into(), JsonValue::String(parent.to_string()));
        }
        if let Some(sdf_data) = &self.sdf_data {
            fields.insert(
                "sdf_data".into(),
                JsonValue::Object(sdf_data.as_map().clone()),
            );
        }
        if let Some(generated_for) = &self.generated_for {
            fields.insert(
                "generated_for".into(),
                JsonValue::String(generated_for.clone()),
            );
        }
        if let Some(error_message) = &self.error_message {
            fields.insert(
                "error_message".into(),
                JsonValue::String(error_message.clone()),
            );
        }
        if let Some(last_updated) = self.last_updated {
            let formatted = last_updated.format(&Rfc3339).map_err(|err| {
                ValidationError::InvalidTimestamp {
                    field: "last_updated",
                    reason: err.to_string(),
                }
            })?;
            fields.insert("last_updated".into(), JsonValue::String(formatted));
        }
        Ok(fields)
    }

    /// Encodes the job the way the store persists it.
    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a job written by [`Job::to_stored`] without running the
    /// schema validator again. Only for reading back the store's own rows.
    #[doc(hidden)]
    pub fn from_stored(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<StoredJob>(data).map(Self::from)
    }

    /// Merges `patch` over this job's fields and validates the result as a
    /// brand new job. Keys in `patch` win; `null` clears an optional field.
    pub fn apply_patch(
        &self,
        patch: &JsonMap<String, JsonValue>,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, ValidationError> {
        let mut fields = self.to_fields()?;
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        Self::construct(fields, validator)
    }
}

/// A stored job together with the id the store issued for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRecord {
    id: JobId,
    #[serde(rename = "data")]
    job: Job,
}

impl JobRecord {
    pub fn new(id: JobId, job: Job) -> Self {
        Self { id, job }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_parts(self) -> (JobId, Job) {
        (self.id, self.job)
    }
}

fn take_field(fields: &mut JsonMap<String, JsonValue>, name: &str) -> Option<JsonValue> {
    match fields.remove(name) {
        None | Some(JsonValue::Null) => None,
        Some(value) => Some(value),
    }
}

fn required_string(
    fields: &mut JsonMap<String, JsonValue>,
    name: &'static str,
) -> Result<String, ValidationError> {
    optional_string(fields, name)?.ok_or(ValidationError::MissingField(name))
}

fn optional_string(
    fields: &mut JsonMap<String, JsonValue>,
    name: &'static str,
) -> Result<Option<String>, ValidationError> {
    match take_field(fields, name) {
        None => Ok(None),
        Some(JsonValue::String(value)) => Ok(Some(value)),
        Some(_) => Err(ValidationError::InvalidType {
            field: name,
            expected: "a string",
        }),
    }
}

fn required_status(fields: &mut JsonMap<String, JsonValue>) -> Result<Status, ValidationError> {
    match take_field(fields, "status") {
        None => Err(ValidationError::MissingField("status")),
        Some(JsonValue::String(raw)) => raw.parse(),
        Some(other) => Err(ValidationError::InvalidStatus(other.to_string())),
    }
}

fn optional_job_id(
    fields: &mut JsonMap<String, JsonValue>,
    name: &'static str,
) -> Result<Option<JobId>, ValidationError> {
    let Some(raw) = optional_string(fields, name)? else {
        return Ok(None);
    };
    JobId::try_new(raw)
        .map(Some)
        .map_err(|source| ValidationError::InvalidJobId {
            field: name,
            source,
        })
}

fn optional_timestamp(
    fields: &mut JsonMap<String, JsonValue>,
    name: &'static str,
) -> Result<Option<OffsetDateTime>, ValidationError> {
    let Some(raw) = optional_string(fields, name)? else {
        return Ok(None);
    };
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map(Some)
        .map_err(|err| ValidationError::InvalidTimestamp {
            field: name,
            reason: err.to_string(),
        })
}

fn optional_document(
    fields: &mut JsonMap<String, JsonValue>,
    name: &'static str,
    validator: &dyn SchemaValidator,
) -> Result<Option<SdfDocument>, ValidationError> {
    match take_field(fields, name) {
        None => Ok(None),
        Some(JsonValue::Object(document)) => Ok(Some(SdfDocument::validate(document, validator)?)),
        Some(_) => Err(ValidationError::InvalidType {
            field: name,
            expected: "a JSON object",
        }),
    }
}
