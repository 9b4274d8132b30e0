#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_FILE_NAME: &str = "jobs.db";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to open a [`super::SqliteStore`]. Passed by value at
/// open time; there is no process-wide default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    pub file_name: String,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.file_name)
    }
}
