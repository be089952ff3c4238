use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::hiring::assessment::Quiz;
use crate::workflows::hiring::domain::{ActorId, JobId, Role};
use crate::workflows::hiring::gate::GatedState;

/// Lifecycle of a job posting across the approval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    PendingHrEnhancement,
    HrEnhancementComplete,
    PendingCeoApproval,
    Approved,
    Rejected,
    Published,
    Paused,
    Closed,
    Archived,
}

const PROJECT_LEADER: &[Role] = &[Role::ProjectLeader];
const HR: &[Role] = &[Role::Hr];
const CEO: &[Role] = &[Role::Ceo];
const PUBLISHERS: &[Role] = &[Role::ProjectLeader, Role::Ceo];
const NOBODY: &[Role] = &[];

impl JobStatus {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Draft,
            Self::PendingHrEnhancement,
            Self::HrEnhancementComplete,
            Self::PendingCeoApproval,
            Self::Approved,
            Self::Rejected,
            Self::Published,
            Self::Paused,
            Self::Closed,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingHrEnhancement => "pending_hr_enhancement",
            Self::HrEnhancementComplete => "hr_enhancement_complete",
            Self::PendingCeoApproval => "pending_ceo_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Published => "published",
            Self::Paused => "paused",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }

    /// No outgoing edges; the record is retained as-is.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Archived)
    }

    /// Statuses in which the project leader may still swap the technical quiz.
    pub const fn accepts_quiz_edits(self) -> bool {
        matches!(
            self,
            Self::Draft | Self::PendingHrEnhancement | Self::HrEnhancementComplete
        )
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
    }
}

impl GatedState for JobStatus {
    fn all() -> &'static [Self] {
        const ALL: [JobStatus; 10] = JobStatus::ordered();
        &ALL
    }

    fn edge_roles(from: Self, to: Self) -> &'static [Role] {
        use JobStatus::*;

        match (from, to) {
            (Draft, PendingHrEnhancement) => PROJECT_LEADER,
            (PendingHrEnhancement, HrEnhancementComplete) => HR,
            (HrEnhancementComplete, PendingCeoApproval) => PROJECT_LEADER,
            (HrEnhancementComplete | PendingCeoApproval, Approved | Rejected) => CEO,
            (Approved, Published) => PUBLISHERS,
            (Published, Paused | Closed) => PUBLISHERS,
            (Paused, Published | Closed) => PUBLISHERS,
            (Rejected, Archived) => PUBLISHERS,
            _ => NOBODY,
        }
    }

    fn as_str(self) -> &'static str {
        self.label()
    }
}

/// An actor's involvement with a job: who, in which role, when, and what they said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorStamp {
    pub actor_id: ActorId,
    pub role: Role,
    pub acted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ActorStamp {
    pub fn new(actor_id: ActorId, role: Role, acted_at: DateTime<Utc>) -> Self {
        Self {
            actor_id,
            role,
            acted_at: Some(acted_at),
            feedback: None,
        }
    }
}

/// One committed status change in a job's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub from: JobStatus,
    pub to: JobStatus,
    pub actor_id: ActorId,
    pub role: Role,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Fields a project leader supplies when opening a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub technical_quiz: Option<Quiz>,
    #[serde(default)]
    pub technical_quiz_hard_gate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub department: String,
    pub location: String,
    pub requirements: Vec<String>,
    pub status: JobStatus,
    pub project_leader: ActorStamp,
    pub hr_manager: Option<ActorStamp>,
    pub ceo_approver: Option<ActorStamp>,
    pub workflow_history: Vec<WorkflowEvent>,
    pub technical_quiz: Option<Quiz>,
    pub hr_quiz: Option<Quiz>,
    /// A failed technical assessment rejects the application instead of moving it on.
    pub technical_quiz_hard_gate: bool,
    pub views_count: u64,
    pub applications_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Job {
    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.workflow_history.last().map(|event| event.at)
    }

    pub fn has_technical_quiz(&self) -> bool {
        self.technical_quiz
            .as_ref()
            .is_some_and(|quiz| !quiz.is_empty())
    }

    pub fn has_hr_quiz(&self) -> bool {
        self.hr_quiz.as_ref().is_some_and(|quiz| !quiz.is_empty())
    }

    pub fn is_accepting_applications(&self) -> bool {
        self.status == JobStatus::Published
    }

    /// CEO feedback left on a rejection, if any.
    pub fn rejection_feedback(&self) -> Option<&str> {
        match self.status {
            JobStatus::Rejected | JobStatus::Archived => self
                .ceo_approver
                .as_ref()
                .and_then(|stamp| stamp.feedback.as_deref()),
            _ => None,
        }
    }
}
