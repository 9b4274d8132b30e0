#![forbid(unsafe_code)]

//! Predicate queries over the stored jobs.
//!
//! There is no secondary index: every query is a full scan of
//! [`SqliteStore::list_all`] filtered in memory.

use super::*;
use kp_core::{JobId, JobRecord, Status};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    /// Only jobs without a parent.
    Root,
    Child(JobId),
}

impl ParentFilter {
    pub fn from_parent(parent: Option<&JobId>) -> Self {
        match parent {
            Some(parent) => Self::Child(parent.clone()),
            None => Self::Root,
        }
    }

    fn matches(&self, parent: Option<&JobId>) -> bool {
        match self {
            Self::Any => true,
            Self::Root => parent.is_none(),
            Self::Child(expected) => parent == Some(expected),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<Status>,
    pub parent: ParentFilter,
}

impl JobFilter {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            parent: ParentFilter::Any,
        }
    }

    pub fn parent(parent: Option<&JobId>) -> Self {
        Self {
            status: None,
            parent: ParentFilter::from_parent(parent),
        }
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        let job = record.job();
        self.status.is_none_or(|status| job.status == status)
            && self.parent.matches(job.parent.as_ref())
    }
}

impl SqliteStore {
    pub fn list_matching(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        let records: Vec<JobRecord> = self
            .list_all()?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        debug!(?filter, matched = records.len(), "job scan");
        Ok(records)
    }

    pub fn list_by_status(&self, status: Status) -> Result<Vec<JobRecord>, StoreError> {
        self.list_matching(&JobFilter::status(status))
    }

    /// Jobs whose parent is `parent`; `None` selects jobs with no parent.
    pub fn list_by_parent(&self, parent: Option<&JobId>) -> Result<Vec<JobRecord>, StoreError> {
        self.list_matching(&JobFilter::parent(parent))
    }
}
