#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_JOB_ID_LEN: usize = 128;

/// Opaque job identifier. Issued by the store on insert; callers only parse
/// ids they were handed back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, JobIdError> {
        let value = value.into();
        validate_job_id(&value)?;
        Ok(Self(value))
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().hyphenated().to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = JobIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum JobIdError {
    #[error("job id must not be empty")]
    Empty,
    #[error("job id is too long")]
    TooLong,
    #[error("job id contains control characters")]
    ContainsControl,
}

fn validate_job_id(value: &str) -> Result<(), JobIdError> {
    if value.trim().is_empty() {
        return Err(JobIdError::Empty);
    }
    if value.len() > MAX_JOB_ID_LEN {
        return Err(JobIdError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(JobIdError::ContainsControl);
    }
    Ok(())
}
