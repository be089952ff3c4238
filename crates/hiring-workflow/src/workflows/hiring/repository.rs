use serde::{Deserialize, Serialize};

use super::applications::Application;
use super::domain::{ActorId, ApplicationId, JobId, Role};
use super::jobs::Job;

/// Job storage. `save` is a compare-and-swap on the stored version.
pub trait JobRepository: Send + Sync {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError>;
    fn load(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    fn save(&self, job: Job, expected_version: u64) -> Result<(), RepositoryError>;
    fn list(&self) -> Result<Vec<Job>, RepositoryError>;
}

/// Application storage. `save` is a compare-and-swap on the stored version.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn load(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn save(&self, application: Application, expected_version: u64) -> Result<(), RepositoryError>;
    fn list_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored version is {found}, expected {expected}")]
    Stale { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, chat, in-app inbox).
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: Role, event: NotificationEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    JobSubmittedForHr { job_id: JobId },
    HrEnhancementCompleted { job_id: JobId },
    CeoApprovalRequested { job_id: JobId },
    JobApproved { job_id: JobId },
    JobRejected { job_id: JobId, feedback: String },
    ApplicationSubmitted { job_id: JobId, application_id: ApplicationId },
    AssessmentsCompleted { job_id: JobId, application_id: ApplicationId },
    DecisionPending { job_id: JobId, application_id: ApplicationId },
    DecisionRecorded {
        application_id: ApplicationId,
        candidate_id: ActorId,
        verdict: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Identifies a job and, optionally, the version the caller last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub id: JobId,
    pub version: Option<u64>,
}

impl JobRef {
    pub fn at_version(id: JobId, version: u64) -> Self {
        Self {
            id,
            version: Some(version),
        }
    }
}

impl From<&Job> for JobRef {
    fn from(job: &Job) -> Self {
        Self::at_version(job.id.clone(), job.version)
    }
}

impl From<JobId> for JobRef {
    fn from(id: JobId) -> Self {
        Self { id, version: None }
    }
}

impl From<&JobId> for JobRef {
    fn from(id: &JobId) -> Self {
        Self::from(id.clone())
    }
}

/// Identifies an application and, optionally, the version the caller last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRef {
    pub id: ApplicationId,
    pub version: Option<u64>,
}

impl ApplicationRef {
    pub fn at_version(id: ApplicationId, version: u64) -> Self {
        Self {
            id,
            version: Some(version),
        }
    }
}

impl From<&Application> for ApplicationRef {
    fn from(application: &Application) -> Self {
        Self::at_version(application.id.clone(), application.version)
    }
}

impl From<ApplicationId> for ApplicationRef {
    fn from(id: ApplicationId) -> Self {
        Self { id, version: None }
    }
}

impl From<&ApplicationId> for ApplicationRef {
    fn from(id: &ApplicationId) -> Self {
        Self::from(id.clone())
    }
}
