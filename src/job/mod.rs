//! Job identifiers and job records

use chrono::{DateTime, Utc};
use conduit_state::{StateDocument, StateStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::project::Project;
use crate::ConduitResult;

/// Record file inside a job directory
pub const JOB_RECORD_FILE: &str = "job.yml";

/// Opaque identifier correlating the processes, logs and state of one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Persisted record of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,

    /// Pipeline description, e.g. `tap-mock:target-mock`
    pub elt_uri: String,

    pub state: JobState,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StateDocument for JobRecord {
    fn validate(&self) -> Result<(), String> {
        match (self.state.is_finished(), self.ended_at) {
            (true, None) => Err(format!("Finished job {} has no end time", self.job_id)),
            (false, Some(_)) => Err(format!("Running job {} has an end time", self.job_id)),
            _ => Ok(()),
        }
    }
}

/// Records job start and completion under the job directory
#[derive(Debug, Clone)]
pub struct JobLoggingService {
    project: Project,
}

impl JobLoggingService {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn record_path(&self, job_id: &JobId) -> PathBuf {
        self.project.job_dir(job_id).join(JOB_RECORD_FILE)
    }

    fn store(&self, job_id: &JobId) -> StateStore<JobRecord> {
        StateStore::new(self.record_path(job_id))
    }

    /// Record a running job
    pub fn start(&self, job_id: &JobId, elt_uri: &str) -> ConduitResult<JobRecord> {
        let record = JobRecord {
            job_id: job_id.clone(),
            elt_uri: elt_uri.to_string(),
            state: JobState::Running,
            started_at: Utc::now(),
            ended_at: None,
            error: None,
        };

        self.store(job_id).write(&record)?;
        info!("Started job {} ({})", job_id, elt_uri);
        Ok(record)
    }

    /// Mark a running job as finished
    pub fn finish(
        &self,
        job_id: &JobId,
        state: JobState,
        error: Option<String>,
    ) -> ConduitResult<JobRecord> {
        let record = self.store(job_id).scoped_update(|record: &mut JobRecord| {
            record.state = state;
            record.ended_at = Some(Utc::now());
            record.error = error;
            Ok::<_, crate::ConduitError>(record.clone())
        })?;

        info!("Job {} finished: {:?}", job_id, state);
        Ok(record)
    }

    pub fn get(&self, job_id: &JobId) -> ConduitResult<JobRecord> {
        Ok(self.store(job_id).read()?)
    }
}
