use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::hiring::assessment::{AssessmentResult, QuizKind};
use crate::workflows::hiring::domain::{ActorId, ApplicationId, JobId, Role};
use crate::workflows::hiring::gate::GatedState;

/// Candidate-facing progress of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    TechnicalReview,
    HrReview,
    UnderReview,
    InterviewScheduled,
    InterviewCompleted,
    PendingDecision,
    Accepted,
    Rejected,
    Withdrawn,
}

const CANDIDATE: &[Role] = &[Role::Candidate];
const CANDIDATE_OR_SYSTEM: &[Role] = &[Role::Candidate, Role::System];
const SYSTEM: &[Role] = &[Role::System];
const REVIEWERS: &[Role] = &[Role::ProjectLeader, Role::Hr];
const PROJECT_LEADER: &[Role] = &[Role::ProjectLeader];
const NOBODY: &[Role] = &[];

impl ApplicationStatus {
    /// The happy path used for progress reporting.
    pub const fn canonical() -> [Self; 8] {
        [
            Self::Submitted,
            Self::TechnicalReview,
            Self::HrReview,
            Self::UnderReview,
            Self::InterviewScheduled,
            Self::InterviewCompleted,
            Self::PendingDecision,
            Self::Accepted,
        ]
    }

    pub const fn ordered() -> [Self; 10] {
        [
            Self::Submitted,
            Self::TechnicalReview,
            Self::HrReview,
            Self::UnderReview,
            Self::InterviewScheduled,
            Self::InterviewCompleted,
            Self::PendingDecision,
            Self::Accepted,
            Self::Rejected,
            Self::Withdrawn,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::TechnicalReview => "technical_review",
            Self::HrReview => "hr_review",
            Self::UnderReview => "under_review",
            Self::InterviewScheduled => "interview_scheduled",
            Self::InterviewCompleted => "interview_completed",
            Self::PendingDecision => "pending_decision",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }

    /// `(index + 1) / 8 * 100` along the canonical path; rejected and withdrawn read 100.
    pub fn progress_percentage(self) -> u8 {
        let canonical = Self::canonical();
        match canonical.iter().position(|status| *status == self) {
            Some(index) => {
                let ratio = (index as f64 + 1.0) / canonical.len() as f64 * 100.0;
                ratio.round() as u8
            }
            None => 100,
        }
    }
}

impl GatedState for ApplicationStatus {
    fn all() -> &'static [Self] {
        const ALL: [ApplicationStatus; 10] = ApplicationStatus::ordered();
        &ALL
    }

    fn edge_roles(from: Self, to: Self) -> &'static [Role] {
        use ApplicationStatus::*;

        match (from, to) {
            (Submitted, TechnicalReview) => CANDIDATE,
            (TechnicalReview, HrReview) => CANDIDATE_OR_SYSTEM,
            (TechnicalReview, Rejected) => SYSTEM,
            (HrReview, UnderReview) => CANDIDATE_OR_SYSTEM,
            (UnderReview, InterviewScheduled) => REVIEWERS,
            (InterviewScheduled, InterviewCompleted) => REVIEWERS,
            (UnderReview | InterviewCompleted, PendingDecision) => PROJECT_LEADER,
            (PendingDecision, Accepted | Rejected) => PROJECT_LEADER,
            (from, Withdrawn) if !from.is_terminal() => CANDIDATE,
            _ => NOBODY,
        }
    }

    fn as_str(self) -> &'static str {
        self.label()
    }
}

/// Who applied. Resume and portfolio links are opaque document-service URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: ActorId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
}

/// Candidate-supplied form data; the candidate id comes from the actor context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub actor_id: ActorId,
    pub role: Role,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionVerdict {
    #[default]
    Pending,
    Accept,
    Reject,
}

impl DecisionVerdict {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

/// The project leader's final call on an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLeaderDecision {
    pub verdict: DecisionVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub candidate: CandidateProfile,
    pub status: ApplicationStatus,
    pub technical_assessment: AssessmentResult,
    pub hr_assessment: AssessmentResult,
    /// Only present once both assessments are completed.
    pub overall_score: Option<u8>,
    pub timeline: Vec<TimelineEvent>,
    pub decision: ProjectLeaderDecision,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Application {
    pub fn assessment(&self, kind: QuizKind) -> &AssessmentResult {
        match kind {
            QuizKind::Technical => &self.technical_assessment,
            QuizKind::Hr => &self.hr_assessment,
        }
    }

    pub(crate) fn assessment_mut(&mut self, kind: QuizKind) -> &mut AssessmentResult {
        match kind {
            QuizKind::Technical => &mut self.technical_assessment,
            QuizKind::Hr => &mut self.hr_assessment,
        }
    }

    pub fn progress_percentage(&self) -> u8 {
        self.status.progress_percentage()
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.timeline.last().map(|event| event.at)
    }

    pub fn is_owned_by(&self, actor_id: &ActorId) -> bool {
        &self.candidate.candidate_id == actor_id
    }

    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            application_id: self.id.clone(),
            job_id: self.job_id.clone(),
            candidate_name: self.candidate.name.clone(),
            status: self.status.label(),
            progress_percentage: self.progress_percentage(),
            technical_percentage: completed_percentage(&self.technical_assessment),
            hr_percentage: completed_percentage(&self.hr_assessment),
            overall_score: self.overall_score,
            decision: self.decision.verdict.label(),
            version: self.version,
        }
    }
}

fn completed_percentage(result: &AssessmentResult) -> Option<u8> {
    result.status.is_finished().then_some(result.percentage)
}

/// Compact, display-ready projection of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub candidate_name: String,
    pub status: &'static str,
    pub progress_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    pub decision: &'static str,
    pub version: u64,
}
