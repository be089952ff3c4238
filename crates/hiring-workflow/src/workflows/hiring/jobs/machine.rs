use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{ActorStamp, Job, JobDraft, JobStatus, WorkflowEvent};
use crate::workflows::hiring::assessment::Quiz;
use crate::workflows::hiring::domain::{monotonic, ActorContext, JobId, Role, TransitionError};
use crate::workflows::hiring::gate::{GatedState, RoleGate};

/// A request to move a job along its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    SubmitForHrEnhancement,
    CompleteHrEnhancement { hr_quiz: Quiz },
    RequestCeoApproval,
    Approve { notes: Option<String> },
    Reject { feedback: String },
    Publish,
    Pause,
    Resume,
    Close,
    Archive,
}

impl JobEvent {
    pub fn target(&self) -> JobStatus {
        match self {
            JobEvent::SubmitForHrEnhancement => JobStatus::PendingHrEnhancement,
            JobEvent::CompleteHrEnhancement { .. } => JobStatus::HrEnhancementComplete,
            JobEvent::RequestCeoApproval => JobStatus::PendingCeoApproval,
            JobEvent::Approve { .. } => JobStatus::Approved,
            JobEvent::Reject { .. } => JobStatus::Rejected,
            JobEvent::Publish | JobEvent::Resume => JobStatus::Published,
            JobEvent::Pause => JobStatus::Paused,
            JobEvent::Close => JobStatus::Closed,
            JobEvent::Archive => JobStatus::Archived,
        }
    }
}

/// Opens a new draft owned by the calling project leader.
pub fn create_job(
    id: JobId,
    draft: JobDraft,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Job, TransitionError> {
    if !actor.has_role(Role::ProjectLeader) {
        deny(actor, "none", JobStatus::Draft.label());
        return Err(TransitionError::Unauthorized {
            actor: actor.actor_id.clone(),
            from: "none",
            to: JobStatus::Draft.label(),
        });
    }
    if draft.title.trim().is_empty() {
        return Err(TransitionError::IncompleteJob { field: "title" });
    }

    Ok(Job {
        id,
        title: draft.title.trim().to_string(),
        description: draft.description,
        department: draft.department,
        location: draft.location,
        requirements: draft.requirements,
        status: JobStatus::Draft,
        project_leader: ActorStamp::new(actor.actor_id.clone(), Role::ProjectLeader, now),
        hr_manager: None,
        ceo_approver: None,
        workflow_history: Vec::new(),
        technical_quiz: draft.technical_quiz,
        hr_quiz: None,
        technical_quiz_hard_gate: draft.technical_quiz_hard_gate,
        views_count: 0,
        applications_count: 0,
        revision_of: None,
        previous_feedback: None,
        created_at: now,
        updated_at: now,
        version: 1,
    })
}

/// Computes the next version of `job` after `event`. The input is never modified.
///
/// Checks run in a fixed order: the actor must hold a role that owns some edge into the
/// target, the edge must exist from the current status, the actor must own that edge, and
/// finally the job must carry whatever the target status requires.
pub fn transition(
    job: &Job,
    event: JobEvent,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Job, TransitionError> {
    let from = job.status;
    let to = event.target();

    if !RoleGate::may_target(&actor.roles, to) {
        deny(actor, from.label(), to.label());
        return Err(TransitionError::Unauthorized {
            actor: actor.actor_id.clone(),
            from: from.label(),
            to: to.label(),
        });
    }
    if !RoleGate::edge_exists(from, to) {
        return Err(TransitionError::IllegalTransition {
            from: from.label(),
            to: to.label(),
        });
    }
    if !RoleGate::can_transition(&actor.roles, from, to) {
        deny(actor, from.label(), to.label());
        return Err(TransitionError::Unauthorized {
            actor: actor.actor_id.clone(),
            from: from.label(),
            to: to.label(),
        });
    }

    let role = acting_role(actor, from, to);
    let at = monotonic(now, job.last_event_at());
    let mut next = job.clone();
    let mut notes = None;

    match event {
        JobEvent::CompleteHrEnhancement { hr_quiz } => {
            if hr_quiz.is_empty() {
                return Err(TransitionError::IncompleteJob { field: "hr_quiz" });
            }
            next.hr_quiz = Some(hr_quiz);
            next.hr_manager = Some(ActorStamp::new(actor.actor_id.clone(), role, at));
        }
        JobEvent::RequestCeoApproval => {
            if !job.has_technical_quiz() {
                return Err(TransitionError::IncompleteJob {
                    field: "technical_quiz",
                });
            }
        }
        JobEvent::Approve { notes: approval_notes } => {
            if !job.has_technical_quiz() {
                return Err(TransitionError::IncompleteJob {
                    field: "technical_quiz",
                });
            }
            let mut stamp = ActorStamp::new(actor.actor_id.clone(), role, at);
            stamp.feedback = approval_notes.clone();
            next.ceo_approver = Some(stamp);
            notes = approval_notes;
        }
        JobEvent::Reject { feedback } => {
            let mut stamp = ActorStamp::new(actor.actor_id.clone(), role, at);
            stamp.feedback = Some(feedback.clone());
            next.ceo_approver = Some(stamp);
            notes = Some(feedback);
        }
        JobEvent::SubmitForHrEnhancement
        | JobEvent::Publish
        | JobEvent::Pause
        | JobEvent::Resume
        | JobEvent::Close
        | JobEvent::Archive => {}
    }

    next.status = to;
    next.workflow_history.push(WorkflowEvent {
        from,
        to,
        actor_id: actor.actor_id.clone(),
        role,
        at,
        notes,
    });
    next.updated_at = at;
    next.version = job.version + 1;

    info!(
        job_id = %job.id,
        actor = %actor.actor_id,
        role = role.as_str(),
        from = from.label(),
        to = to.label(),
        "job transition computed"
    );

    Ok(next)
}

/// Replays a history from `draft`, returning the status it ends in.
pub fn replay_history(history: &[WorkflowEvent]) -> Result<JobStatus, TransitionError> {
    history.iter().try_fold(JobStatus::Draft, |current, event| {
        if event.from != current || !RoleGate::edge_exists(event.from, event.to) {
            return Err(TransitionError::IllegalTransition {
                from: current.label(),
                to: event.to.label(),
            });
        }
        Ok(event.to)
    })
}

/// Attaches or replaces the technical quiz. Not a status change, so history is untouched.
pub fn replace_technical_quiz(
    job: &Job,
    quiz: Quiz,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Job, TransitionError> {
    if !actor.has_role(Role::ProjectLeader) {
        deny(actor, job.status.label(), job.status.label());
        return Err(TransitionError::Unauthorized {
            actor: actor.actor_id.clone(),
            from: job.status.label(),
            to: job.status.label(),
        });
    }
    if !job.status.accepts_quiz_edits() {
        return Err(TransitionError::RecordLocked {
            status: job.status.label(),
        });
    }

    let mut next = job.clone();
    next.technical_quiz = Some(quiz);
    next.updated_at = monotonic(now, Some(job.updated_at));
    next.version = job.version + 1;
    Ok(next)
}

/// Starts a fresh draft from a rejected job, carrying the CEO's feedback forward.
pub fn revise_rejected(
    job: &Job,
    new_id: JobId,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Result<Job, TransitionError> {
    if job.status != JobStatus::Rejected {
        return Err(TransitionError::IllegalTransition {
            from: job.status.label(),
            to: JobStatus::Draft.label(),
        });
    }

    let draft = JobDraft {
        title: job.title.clone(),
        description: job.description.clone(),
        department: job.department.clone(),
        location: job.location.clone(),
        requirements: job.requirements.clone(),
        technical_quiz: job.technical_quiz.clone(),
        technical_quiz_hard_gate: job.technical_quiz_hard_gate,
    };
    let mut revised = create_job(new_id, draft, actor, now)?;
    revised.revision_of = Some(job.id.clone());
    revised.previous_feedback = job.rejection_feedback().map(str::to_string);
    Ok(revised)
}

pub fn record_view(job: &Job, now: DateTime<Utc>) -> Result<Job, TransitionError> {
    if !job.is_accepting_applications() {
        return Err(TransitionError::JobNotPublished {
            status: job.status.label(),
        });
    }
    let mut next = job.clone();
    next.views_count += 1;
    next.updated_at = monotonic(now, Some(job.updated_at));
    next.version = job.version + 1;
    Ok(next)
}

pub fn count_application(job: &Job, now: DateTime<Utc>) -> Job {
    let mut next = job.clone();
    next.applications_count += 1;
    next.updated_at = monotonic(now, Some(job.updated_at));
    next.version = job.version + 1;
    next
}

/// The role recorded against an edge: the first role the actor holds that owns it.
fn acting_role(actor: &ActorContext, from: JobStatus, to: JobStatus) -> Role {
    JobStatus::edge_roles(from, to)
        .iter()
        .copied()
        .find(|role| actor.has_role(*role))
        .unwrap_or_else(|| actor.primary_role())
}

fn deny(actor: &ActorContext, from: &str, to: &str) {
    let roles: Vec<&str> = actor.roles.iter().map(|role| role.as_str()).collect();
    warn!(
        target: "security",
        actor = %actor.actor_id,
        roles = ?roles,
        from,
        to,
        "job transition denied"
    );
}
