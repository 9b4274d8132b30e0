#![forbid(unsafe_code)]

use super::*;
use kp_core::{Job, JobId, JobRecord, SchemaValidator};
use rusqlite::{OptionalExtension, params};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

fn encode_job(id: &JobId, job: &Job) -> Result<String, StoreError> {
    job.to_stored().map_err(|err| StoreError::Codec {
        id: id.to_string(),
        reason: err.to_string(),
    })
}

fn decode_job(id: &str, data: &str) -> Result<Job, StoreError> {
    Job::from_stored(data).map_err(|err| StoreError::Codec {
        id: id.to_string(),
        reason: err.to_string(),
    })
}

fn read_record(id: String, data: &str) -> Result<JobRecord, StoreError> {
    let job = decode_job(&id, data)?;
    let id = JobId::try_new(id.clone()).map_err(|err| StoreError::Codec {
        id,
        reason: err.to_string(),
    })?;
    Ok(JobRecord::new(id, job))
}

fn select_job_data(conn: &Connection, id: &JobId) -> Result<Option<String>, StoreError> {
    let data = conn
        .query_row(
            "SELECT data FROM jobs WHERE id=?1",
            params![id.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(data)
}

impl SqliteStore {
    /// Stores `job` under a freshly issued id and returns that id.
    pub fn insert(&mut self, job: Job) -> Result<JobId, StoreError> {
        let (id, _) = self.insert_record(job)?.into_parts();
        Ok(id)
    }

    /// Builds a job from caller fields and stores it. Nothing is written
    /// when validation fails.
    pub fn create(
        &mut self,
        fields: JsonMap<String, JsonValue>,
        validator: &dyn SchemaValidator,
    ) -> Result<JobRecord, StoreError> {
        let job = Job::construct(fields, validator)?;
        self.insert_record(job)
    }

    pub fn get(&self, id: &JobId) -> Result<JobRecord, StoreError> {
        let Some(data) = select_job_data(self.conn()?, id)? else {
            return Err(StoreError::NotFound(id.clone()));
        };
        Ok(JobRecord::new(id.clone(), decode_job(id.as_str(), &data)?))
    }

    /// Replaces the whole stored job at `id`. The id must already exist.
    pub fn update(&mut self, id: &JobId, mut job: Job) -> Result<JobRecord, StoreError> {
        let tx = self.conn_mut()?.transaction()?;
        let Some(previous) = select_job_data(&tx, id)? else {
            return Err(StoreError::NotFound(id.clone()));
        };
        let previous = decode_job(id.as_str(), &previous)?;

        // Never move the stamp backwards, even if the wall clock does.
        let current = now();
        let stamp = match previous.last_updated {
            Some(prev) if prev > current => prev,
            _ => current,
        };
        job.last_updated = Some(stamp);

        let data = encode_job(id, &job)?;
        tx.execute(
            "UPDATE jobs SET data=?2 WHERE id=?1",
            params![id.as_str(), data],
        )?;
        tx.commit()?;

        debug!(job_id = %id, status = %job.status, "job updated");
        Ok(JobRecord::new(id.clone(), job))
    }

    pub fn delete(&mut self, id: &JobId) -> Result<(), StoreError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM jobs WHERE id=?1", params![id.as_str()])?;
        if removed == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        debug!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Every stored job, in no particular order.
    pub fn list_all(&self) -> Result<Vec<JobRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, data FROM jobs")?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let data: String = row.get(1)?;
            out.push(read_record(id, &data)?);
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count = self
            .conn()?
            .query_row("SELECT COUNT(1) FROM jobs", [], |row| row.get::<_, i64>(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.count()? == 0)
    }

    fn insert_record(&mut self, mut job: Job) -> Result<JobRecord, StoreError> {
        let id = JobId::generate();
        job.last_updated = Some(now());

        let data = encode_job(&id, &job)?;
        self.conn()?.execute(
            "INSERT INTO jobs(id, data) VALUES (?1, ?2)",
            params![id.as_str(), data],
        )?;

        debug!(job_id = %id, status = %job.status, "job inserted");
        Ok(JobRecord::new(id, job))
    }
}
