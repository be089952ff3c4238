use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationStatus, ApplicationSubmission, CandidateProfile, DecisionVerdict,
    ProjectLeaderDecision, TimelineEvent,
};
use crate::workflows::hiring::assessment::{AssessmentResult, QuizKind};
use crate::workflows::hiring::domain::{
    monotonic, ActorContext, ApplicationId, Role, TransitionError,
};
use crate::workflows::hiring::gate::{GatedState, RoleGate};
use crate::workflows::hiring::jobs::Job;

/// Feedback attached to a final decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DecisionInput {
    #[serde(default)]
    pub feedback: Option<String>,
    /// 1-5; out-of-range values are clamped.
    #[serde(default)]
    pub rating: Option<u8>,
}

/// A request to move an application along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationEvent {
    StartTechnicalAssessment,
    AdvanceToHrReview,
    FailTechnicalGate,
    AdvanceToUnderReview,
    ScheduleInterview { notes: Option<String> },
    CompleteInterview { notes: Option<String> },
    RequestDecision,
    Accept(DecisionInput),
    Reject(DecisionInput),
    Withdraw { reason: Option<String> },
}

impl ApplicationEvent {
    pub fn target(&self) -> ApplicationStatus {
        match self {
            ApplicationEvent::StartTechnicalAssessment => ApplicationStatus::TechnicalReview,
            ApplicationEvent::AdvanceToHrReview => ApplicationStatus::HrReview,
            ApplicationEvent::FailTechnicalGate | ApplicationEvent::Reject(_) => {
                ApplicationStatus::Rejected
            }
            ApplicationEvent::AdvanceToUnderReview => ApplicationStatus::UnderReview,
            ApplicationEvent::ScheduleInterview { .. } => ApplicationStatus::InterviewScheduled,
            ApplicationEvent::CompleteInterview { .. } => ApplicationStatus::InterviewCompleted,
            ApplicationEvent::RequestDecision => ApplicationStatus::PendingDecision,
            ApplicationEvent::Accept(_) => ApplicationStatus::Accepted,
            ApplicationEvent::Withdraw { .. } => ApplicationStatus::Withdrawn,
        }
    }
}

/// Builds the initial `submitted` record for a published job.
pub fn open_application(
    id: ApplicationId,
    job: &Job,
    submission: ApplicationSubmission,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Application, TransitionError> {
    if !actor.has_role(Role::Candidate) {
        deny(actor, "none", ApplicationStatus::Submitted.label());
        return Err(TransitionError::Unauthorized {
            actor: actor.actor_id.clone(),
            from: "none",
            to: ApplicationStatus::Submitted.label(),
        });
    }
    if !job.is_accepting_applications() {
        return Err(TransitionError::JobNotPublished {
            status: job.status.label(),
        });
    }
    let (Some(technical_quiz), Some(hr_quiz)) = (&job.technical_quiz, &job.hr_quiz) else {
        let field = if job.technical_quiz.is_none() {
            "technical_quiz"
        } else {
            "hr_quiz"
        };
        return Err(TransitionError::IncompleteJob { field });
    };

    Ok(Application {
        id,
        job_id: job.id.clone(),
        candidate: CandidateProfile {
            candidate_id: actor.actor_id.clone(),
            name: submission.name.trim().to_string(),
            email: submission.email.trim().to_string(),
            phone: submission.phone,
            resume_url: submission.resume_url,
            cover_letter: submission.cover_letter,
        },
        status: ApplicationStatus::Submitted,
        technical_assessment: AssessmentResult::not_started(QuizKind::Technical, technical_quiz),
        hr_assessment: AssessmentResult::not_started(QuizKind::Hr, hr_quiz),
        overall_score: None,
        timeline: Vec::new(),
        decision: ProjectLeaderDecision::default(),
        submitted_at: now,
        updated_at: now,
        version: 1,
    })
}

/// Computes the next version of `application` after `event`; the input is left untouched.
///
/// `job` is the posting the application belongs to and is only read, for decision
/// authority and the technical hard gate.
pub fn transition(
    application: &Application,
    job: &Job,
    event: ApplicationEvent,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Application, TransitionError> {
    let from = application.status;
    let to = event.target();

    if !RoleGate::may_target(&actor.roles, to) {
        return Err(unauthorized(actor, from, to));
    }
    if !RoleGate::edge_exists(from, to) {
        return Err(TransitionError::IllegalTransition {
            from: from.label(),
            to: to.label(),
        });
    }
    if !RoleGate::can_transition(&actor.roles, from, to) {
        return Err(unauthorized(actor, from, to));
    }

    let role = acting_role(actor, from, to);
    if role == Role::Candidate && !application.is_owned_by(&actor.actor_id) {
        deny(actor, from.label(), to.label());
        return Err(TransitionError::CandidateMismatch {
            actor: actor.actor_id.clone(),
        });
    }

    let at = monotonic(now, application.last_event_at());
    let mut next = application.clone();
    let mut notes = None;

    match event {
        ApplicationEvent::AdvanceToHrReview => {
            require_completed(&application.technical_assessment)?;
            if job.technical_quiz_hard_gate && !application.technical_assessment.passed {
                return Err(TransitionError::IllegalTransition {
                    from: from.label(),
                    to: to.label(),
                });
            }
        }
        ApplicationEvent::FailTechnicalGate => {
            require_completed(&application.technical_assessment)?;
            if !job.technical_quiz_hard_gate || application.technical_assessment.passed {
                return Err(TransitionError::IllegalTransition {
                    from: from.label(),
                    to: to.label(),
                });
            }
            notes = Some(format!(
                "technical assessment scored {}% (passing {}%)",
                application.technical_assessment.percentage,
                application.technical_assessment.passing_score
            ));
        }
        ApplicationEvent::AdvanceToUnderReview => {
            require_completed(&application.hr_assessment)?;
        }
        ApplicationEvent::Accept(input) | ApplicationEvent::Reject(input) => {
            if job.project_leader.actor_id != actor.actor_id {
                return Err(unauthorized(actor, from, to));
            }
            let verdict = if to == ApplicationStatus::Accepted {
                DecisionVerdict::Accept
            } else {
                DecisionVerdict::Reject
            };
            notes = input.feedback.clone();
            next.decision = ProjectLeaderDecision {
                verdict,
                feedback: input.feedback,
                rating: input.rating.map(|rating| rating.clamp(1, 5)),
                decided_by: Some(actor.actor_id.clone()),
                decided_at: Some(at),
            };
        }
        ApplicationEvent::ScheduleInterview { notes: given }
        | ApplicationEvent::CompleteInterview { notes: given } => notes = given,
        ApplicationEvent::Withdraw { reason } => notes = reason,
        ApplicationEvent::StartTechnicalAssessment | ApplicationEvent::RequestDecision => {}
    }

    next.status = to;
    next.timeline.push(TimelineEvent {
        from,
        to,
        actor_id: actor.actor_id.clone(),
        role,
        at,
        notes,
    });
    next.updated_at = at;
    next.version = application.version + 1;

    info!(
        application_id = %application.id,
        actor = %actor.actor_id,
        role = role.as_str(),
        from = from.label(),
        to = to.label(),
        "application transition computed"
    );

    Ok(next)
}

/// Writes an assessment result onto the application and refreshes the overall score.
pub fn record_assessment(
    application: &Application,
    result: AssessmentResult,
    now: DateTime<Utc>,
) -> Application {
    let mut next = application.clone();
    let kind = result.kind;
    *next.assessment_mut(kind) = result;
    next.overall_score = overall_score(&next.technical_assessment, &next.hr_assessment);
    next.updated_at = monotonic(now, Some(application.updated_at));
    next.version = application.version + 1;
    next
}

/// Mean of both percentages, rounded; absent until both are completed.
pub fn overall_score(technical: &AssessmentResult, hr: &AssessmentResult) -> Option<u8> {
    if !technical.is_completed() || !hr.is_completed() {
        return None;
    }
    let sum = u16::from(technical.percentage) + u16::from(hr.percentage);
    Some(((sum + 1) / 2) as u8)
}

fn require_completed(result: &AssessmentResult) -> Result<(), TransitionError> {
    if result.is_completed() {
        Ok(())
    } else {
        Err(TransitionError::AssessmentPending {
            kind: result.kind.as_str(),
        })
    }
}

fn acting_role(actor: &ActorContext, from: ApplicationStatus, to: ApplicationStatus) -> Role {
    ApplicationStatus::edge_roles(from, to)
        .iter()
        .copied()
        .find(|role| actor.has_role(*role))
        .unwrap_or_else(|| actor.primary_role())
}

fn unauthorized(
    actor: &ActorContext,
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> TransitionError {
    deny(actor, from.label(), to.label());
    TransitionError::Unauthorized {
        actor: actor.actor_id.clone(),
        from: from.label(),
        to: to.label(),
    }
}

fn deny(actor: &ActorContext, from: &str, to: &str) {
    let roles: Vec<&str> = actor.roles.iter().map(|role| role.as_str()).collect();
    warn!(
        target: "security",
        actor = %actor.actor_id,
        roles = ?roles,
        from,
        to,
        "application transition denied"
    );
}
