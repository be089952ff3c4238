use super::common::*;
use crate::workflows::hiring::applications::{
    self, Application, ApplicationEvent, ApplicationStatus, DecisionInput, DecisionVerdict,
};
use crate::workflows::hiring::assessment::{AssessmentStatus, QuizKind};
use crate::workflows::hiring::domain::{ActorContext, ApplicationId, Role, TransitionError};
use crate::workflows::hiring::jobs::{Job, JobDraft, JobStatus};

const CANDIDATE_ID: &str = "cand-lina";

fn open(job: &Job) -> Application {
    applications::open_application(
        ApplicationId("app-test".to_string()),
        job,
        submission("Lina Park"),
        &candidate(CANDIDATE_ID),
        t0(),
    )
    .expect("application opened")
}

fn step(application: &Application, job: &Job, event: ApplicationEvent, actor: &ActorContext) -> Application {
    applications::transition(application, job, event, actor, t0()).expect("transition allowed")
}

fn record(application: &Application, kind: QuizKind, percentage: u8) -> Application {
    applications::record_assessment(application, completed_result(kind, percentage, 70), t0())
}

/// Drives an application to `under_review` with both assessments completed.
fn under_review(job: &Job) -> Application {
    let me = candidate(CANDIDATE_ID);
    let app = open(job);
    let app = step(&app, job, ApplicationEvent::StartTechnicalAssessment, &me);
    let app = record(&app, QuizKind::Technical, 90);
    let app = step(&app, job, ApplicationEvent::AdvanceToHrReview, &me);
    let app = record(&app, QuizKind::Hr, 75);
    step(&app, job, ApplicationEvent::AdvanceToUnderReview, &me)
}

#[test]
fn progress_follows_the_canonical_path() {
    let expected = [
        (ApplicationStatus::Submitted, 13),
        (ApplicationStatus::TechnicalReview, 25),
        (ApplicationStatus::HrReview, 38),
        (ApplicationStatus::UnderReview, 50),
        (ApplicationStatus::InterviewScheduled, 63),
        (ApplicationStatus::InterviewCompleted, 75),
        (ApplicationStatus::PendingDecision, 88),
        (ApplicationStatus::Accepted, 100),
        (ApplicationStatus::Rejected, 100),
        (ApplicationStatus::Withdrawn, 100),
    ];
    for (status, percentage) in expected {
        assert_eq!(status.progress_percentage(), percentage, "{}", status.label());
    }
}

#[test]
fn progress_never_decreases_along_a_full_pipeline() {
    let job = published_job_record(job_draft());
    let mut app = under_review(&job);
    let mut seen = vec![app.progress_percentage()];

    for (event, actor) in [
        (ApplicationEvent::ScheduleInterview { notes: None }, hr_manager()),
        (
            ApplicationEvent::CompleteInterview {
                notes: Some("Strong systems background".to_string()),
            },
            project_leader(),
        ),
        (ApplicationEvent::RequestDecision, project_leader()),
        (
            ApplicationEvent::Accept(DecisionInput {
                feedback: Some("Welcome aboard".to_string()),
                rating: Some(9),
            }),
            project_leader(),
        ),
    ] {
        app = step(&app, &job, event, &actor);
        seen.push(app.progress_percentage());
    }

    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
    assert_eq!(app.status, ApplicationStatus::Accepted);
    assert_eq!(app.decision.verdict, DecisionVerdict::Accept);
    assert_eq!(app.decision.rating, Some(5));
    assert_eq!(app.decision.decided_by.as_ref().map(|id| id.0.as_str()), Some("pl-ada"));
    assert_eq!(app.timeline.len(), 7);
    assert!(app
        .timeline
        .windows(2)
        .all(|pair| pair[0].at <= pair[1].at));
}

#[test]
fn only_published_jobs_with_both_quizzes_accept_applications() {
    let mut job = published_job_record(job_draft());
    job.status = JobStatus::Paused;
    match applications::open_application(
        ApplicationId("app-x".into()),
        &job,
        submission("Lina Park"),
        &candidate(CANDIDATE_ID),
        t0(),
    ) {
        Err(TransitionError::JobNotPublished { status: "paused" }) => {}
        other => panic!("expected not published, got {other:?}"),
    }

    let mut job = published_job_record(job_draft());
    job.hr_quiz = None;
    match applications::open_application(
        ApplicationId("app-x".into()),
        &job,
        submission("Lina Park"),
        &candidate(CANDIDATE_ID),
        t0(),
    ) {
        Err(TransitionError::IncompleteJob { field: "hr_quiz" }) => {}
        other => panic!("expected incomplete job, got {other:?}"),
    }

    let job = published_job_record(job_draft());
    match applications::open_application(
        ApplicationId("app-x".into()),
        &job,
        submission("Lina Park"),
        &hr_manager(),
        t0(),
    ) {
        Err(TransitionError::Unauthorized { .. }) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }

    let app = open(&job);
    assert_eq!(app.status, ApplicationStatus::Submitted);
    assert_eq!(app.technical_assessment.status, AssessmentStatus::NotStarted);
    assert_eq!(app.technical_assessment.max_score, 30);
    assert_eq!(app.hr_assessment.max_score, 25);
    assert!(app.timeline.is_empty());
    assert_eq!(app.candidate.candidate_id.0, CANDIDATE_ID);
}

#[test]
fn under_review_requires_a_completed_hr_assessment() {
    let job = published_job_record(job_draft());
    let me = candidate(CANDIDATE_ID);
    let app = open(&job);
    let app = step(&app, &job, ApplicationEvent::StartTechnicalAssessment, &me);
    let app = record(&app, QuizKind::Technical, 80);
    let app = step(&app, &job, ApplicationEvent::AdvanceToHrReview, &me);
    assert_eq!(app.status, ApplicationStatus::HrReview);

    match applications::transition(&app, &job, ApplicationEvent::AdvanceToUnderReview, &me, t0()) {
        Err(TransitionError::AssessmentPending { kind }) => assert_eq!(kind, "hr"),
        other => panic!("expected pending hr assessment, got {other:?}"),
    }

    let system = ActorContext::system();
    match applications::transition(
        &app,
        &job,
        ApplicationEvent::AdvanceToUnderReview,
        &system,
        t0(),
    ) {
        Err(TransitionError::AssessmentPending { kind: "hr" }) => {}
        other => panic!("expected pending hr assessment, got {other:?}"),
    }
}

#[test]
fn hr_review_requires_a_completed_technical_assessment() {
    let job = published_job_record(job_draft());
    let me = candidate(CANDIDATE_ID);
    let app = step(&open(&job), &job, ApplicationEvent::StartTechnicalAssessment, &me);

    match applications::transition(&app, &job, ApplicationEvent::AdvanceToHrReview, &me, t0()) {
        Err(TransitionError::AssessmentPending { kind: "technical" }) => {}
        other => panic!("expected pending technical assessment, got {other:?}"),
    }
}

#[test]
fn overall_score_appears_once_both_assessments_complete() {
    let job = published_job_record(job_draft());
    let app = open(&job);
    let app = record(&app, QuizKind::Technical, 85);
    assert_eq!(app.overall_score, None);

    let app = record(&app, QuizKind::Hr, 70);
    assert_eq!(app.overall_score, Some(78));

    let tech = completed_result(QuizKind::Technical, 100, 70);
    let hr = completed_result(QuizKind::Hr, 0, 70);
    assert_eq!(applications::overall_score(&tech, &hr), Some(50));
}

#[test]
fn hard_gate_routes_failed_candidates_to_rejection() {
    let job = published_job_record(JobDraft {
        technical_quiz_hard_gate: true,
        ..job_draft()
    });
    let me = candidate(CANDIDATE_ID);
    let app = step(&open(&job), &job, ApplicationEvent::StartTechnicalAssessment, &me);
    let failed = record(&app, QuizKind::Technical, 40);

    match applications::transition(&failed, &job, ApplicationEvent::AdvanceToHrReview, &me, t0()) {
        Err(TransitionError::IllegalTransition { .. }) => {}
        other => panic!("expected gate to block hr review, got {other:?}"),
    }
    match applications::transition(&failed, &job, ApplicationEvent::FailTechnicalGate, &me, t0()) {
        Err(TransitionError::Unauthorized { .. }) => {}
        other => panic!("expected only the system to reject, got {other:?}"),
    }

    let rejected = step(
        &failed,
        &job,
        ApplicationEvent::FailTechnicalGate,
        &ActorContext::system(),
    );
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(rejected.progress_percentage(), 100);
    let event = rejected.timeline.last().expect("rejection recorded");
    assert_eq!(event.role, Role::System);

    let passed = record(&app, QuizKind::Technical, 90);
    match applications::transition(
        &passed,
        &job,
        ApplicationEvent::FailTechnicalGate,
        &ActorContext::system(),
        t0(),
    ) {
        Err(TransitionError::IllegalTransition { .. }) => {}
        other => panic!("expected passing candidate to stay, got {other:?}"),
    }
}

#[test]
fn soft_gate_lets_failing_candidates_continue() {
    let job = published_job_record(job_draft());
    let me = candidate(CANDIDATE_ID);
    let app = step(&open(&job), &job, ApplicationEvent::StartTechnicalAssessment, &me);
    let failed = record(&app, QuizKind::Technical, 20);

    let next = step(&failed, &job, ApplicationEvent::AdvanceToHrReview, &me);
    assert_eq!(next.status, ApplicationStatus::HrReview);
}

#[test]
fn only_the_owning_project_leader_decides() {
    let job = published_job_record(job_draft());
    let app = under_review(&job);
    let pending = step(&app, &job, ApplicationEvent::RequestDecision, &project_leader());

    match applications::transition(
        &pending,
        &job,
        ApplicationEvent::Reject(DecisionInput::default()),
        &other_project_leader(),
        t0(),
    ) {
        Err(TransitionError::Unauthorized { .. }) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
    match applications::transition(
        &pending,
        &job,
        ApplicationEvent::Accept(DecisionInput::default()),
        &hr_manager(),
        t0(),
    ) {
        Err(TransitionError::Unauthorized { .. }) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }

    let rejected = step(
        &pending,
        &job,
        ApplicationEvent::Reject(DecisionInput {
            feedback: Some("Not enough distributed systems depth".to_string()),
            rating: Some(0),
        }),
        &project_leader(),
    );
    assert_eq!(rejected.decision.verdict, DecisionVerdict::Reject);
    assert_eq!(rejected.decision.rating, Some(1));
}

#[test]
fn withdrawal_is_limited_to_the_owning_candidate_and_open_applications() {
    let job = published_job_record(job_draft());
    let app = under_review(&job);

    match applications::transition(
        &app,
        &job,
        ApplicationEvent::Withdraw { reason: None },
        &candidate("cand-someone-else"),
        t0(),
    ) {
        Err(TransitionError::CandidateMismatch { actor }) => {
            assert_eq!(actor.0, "cand-someone-else")
        }
        other => panic!("expected candidate mismatch, got {other:?}"),
    }

    let withdrawn = step(
        &app,
        &job,
        ApplicationEvent::Withdraw {
            reason: Some("Accepted another offer".to_string()),
        },
        &candidate(CANDIDATE_ID),
    );
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
    assert_eq!(
        withdrawn.timeline.last().and_then(|event| event.notes.as_deref()),
        Some("Accepted another offer")
    );

    match applications::transition(
        &withdrawn,
        &job,
        ApplicationEvent::Withdraw { reason: None },
        &candidate(CANDIDATE_ID),
        t0(),
    ) {
        Err(TransitionError::IllegalTransition { from: "withdrawn", .. }) => {}
        other => panic!("expected illegal transition, got {other:?}"),
    }
}

#[test]
fn interviews_cannot_be_skipped_into_from_submitted() {
    let job = published_job_record(job_draft());
    match applications::transition(
        &open(&job),
        &job,
        ApplicationEvent::ScheduleInterview { notes: None },
        &hr_manager(),
        t0(),
    ) {
        Err(TransitionError::IllegalTransition {
            from: "submitted",
            to: "interview_scheduled",
        }) => {}
        other => panic!("expected illegal transition, got {other:?}"),
    }
}
