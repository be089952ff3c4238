use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::hiring::applications::{Application, ApplicationSubmission};
use crate::workflows::hiring::assessment::{
    AssessmentResult, AssessmentStatus, CompletionReason, QuestionDraft, Quiz, QuizKind,
};
use crate::workflows::hiring::domain::{ActorContext, ApplicationId, JobId, ManualClock, Role};
use crate::workflows::hiring::jobs::{self, Job, JobDraft, JobEvent};
use crate::workflows::hiring::repository::{
    ApplicationRepository, JobRepository, NotificationEvent, Notifier, NotifyError,
    RepositoryError,
};
use crate::workflows::hiring::service::HiringService;

pub(super) type TestService = HiringService<MemoryJobs, MemoryApplications, MemoryNotifier>;

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 7, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn project_leader() -> ActorContext {
    ActorContext::single("pl-ada", Role::ProjectLeader)
}

pub(super) fn other_project_leader() -> ActorContext {
    ActorContext::single("pl-grace", Role::ProjectLeader)
}

pub(super) fn hr_manager() -> ActorContext {
    ActorContext::single("hr-ines", Role::Hr)
}

pub(super) fn ceo() -> ActorContext {
    ActorContext::single("ceo-marta", Role::Ceo)
}

pub(super) fn candidate(id: &str) -> ActorContext {
    ActorContext::single(id, Role::Candidate)
}

/// Two multiple-choice questions worth 10 and 20 points, one minute, 70% to pass.
pub(super) fn technical_quiz() -> Quiz {
    Quiz::from_drafts(
        1,
        70,
        [
            QuestionDraft::multiple_choice(
                "Which keyword moves captured values into a closure?",
                10,
                vec!["ref".into(), "move".into(), "static".into()],
                1,
            ),
            QuestionDraft::multiple_choice(
                "Which trait does `?` use to convert errors?",
                20,
                vec!["From".into(), "Display".into(), "Clone".into()],
                0,
            ),
        ],
    )
    .expect("quiz builds")
}

/// Two questions worth 10 and 15 points.
pub(super) fn hr_quiz() -> Quiz {
    Quiz::from_drafts(
        10,
        60,
        [
            QuestionDraft::multiple_choice(
                "Preferred working arrangement?",
                10,
                vec!["Remote".into(), "Hybrid".into(), "Office".into()],
                1,
            ),
            QuestionDraft::rating(
                "How comfortable are you presenting to clients?",
                15,
                5,
                Some(4),
            ),
        ],
    )
    .expect("quiz builds")
}

pub(super) fn job_draft() -> JobDraft {
    JobDraft {
        title: "Senior Rust Engineer".to_string(),
        description: "Own the assessment platform".to_string(),
        department: "Engineering".to_string(),
        location: "Remote".to_string(),
        requirements: vec!["5 years Rust".to_string()],
        technical_quiz: Some(technical_quiz()),
        technical_quiz_hard_gate: false,
    }
}

pub(super) fn submission(name: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: None,
        resume_url: Some(format!("https://files.example.com/{name}.pdf")),
        cover_letter: None,
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) jobs: Arc<MemoryJobs>,
    pub(super) applications: Arc<MemoryApplications>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) clock: ManualClock,
}

pub(super) fn harness() -> Harness {
    harness_with_notifier(MemoryNotifier::default())
}

pub(super) fn harness_with_notifier(notifier: MemoryNotifier) -> Harness {
    let jobs = Arc::new(MemoryJobs::default());
    let applications = Arc::new(MemoryApplications::default());
    let notifier = Arc::new(notifier);
    let clock = ManualClock::starting_at(t0());
    let service = Arc::new(HiringService::with_clock(
        jobs.clone(),
        applications.clone(),
        notifier.clone(),
        Arc::new(clock.clone()),
    ));
    Harness {
        service,
        jobs,
        applications,
        notifier,
        clock,
    }
}

impl Harness {
    /// Walks a fresh job all the way to `published`.
    pub(super) fn published_job(&self, draft: JobDraft) -> Job {
        let service = &self.service;
        let job = service
            .create_job(draft, &project_leader())
            .expect("draft created");
        let job = service
            .submit_for_hr_enhancement(&job, &project_leader())
            .expect("submitted for HR");
        let job = service
            .enhance_with_hr(&job, hr_quiz(), &hr_manager())
            .expect("HR enhancement");
        let job = service
            .request_ceo_approval(&job, &project_leader())
            .expect("approval requested");
        let job = service.approve_job(&job, None, &ceo()).expect("approved");
        service
            .publish_job(&job, &project_leader())
            .expect("published")
    }

    pub(super) fn apply(&self, job: &Job, candidate_id: &str) -> Application {
        self.service
            .submit_application(&job.id, submission(candidate_id), &candidate(candidate_id))
            .expect("application submitted")
    }

    pub(super) fn stored_application(&self, id: &ApplicationId) -> Application {
        self.applications
            .load(id)
            .expect("load succeeds")
            .expect("application present")
    }

    pub(super) fn stored_job(&self, id: &JobId) -> Job {
        self.jobs
            .load(id)
            .expect("load succeeds")
            .expect("job present")
    }
}

#[derive(Default)]
pub(super) struct MemoryJobs {
    records: Mutex<HashMap<JobId, Job>>,
}

impl JobRepository for MemoryJobs {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn load(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, job: Job, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard.get(&job.id).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found: current.version,
            });
        }
        guard.insert(job.id.clone(), job);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryApplications {
    records: Mutex<HashMap<ApplicationId, Application>>,
    saves_fail: AtomicBool,
}

impl MemoryApplications {
    /// Makes every later `save` fail as if the database were unreachable, until switched back.
    pub(super) fn fail_saves(&self, failing: bool) {
        self.saves_fail.store(failing, Ordering::SeqCst);
    }
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn load(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, application: Application, expected_version: u64) -> Result<(), RepositoryError> {
        if self.saves_fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let current = guard
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found: current.version,
            });
        }
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn list_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| &application.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<(Role, NotificationEvent)>>,
    failing: bool,
}

impl MemoryNotifier {
    pub(super) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(super) fn events(&self) -> Vec<(Role, NotificationEvent)> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, recipient: Role, event: NotificationEvent) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Transport("smtp relay down".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push((recipient, event));
        Ok(())
    }
}

/// Job store whose writes always fail.
#[derive(Default)]
pub(super) struct ReadOnlyJobs {
    pub(super) inner: MemoryJobs,
}

impl JobRepository for ReadOnlyJobs {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert(job)
    }

    fn load(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.load(id)
    }

    fn save(&self, _job: Job, _expected_version: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Pure-machine path to a published job, without a service or repository.
pub(super) fn published_job_record(draft: JobDraft) -> Job {
    let now = t0();
    let job = jobs::create_job(JobId("job-fixture".to_string()), draft, &project_leader(), now)
        .expect("draft created");
    let steps = [
        (JobEvent::SubmitForHrEnhancement, project_leader()),
        (JobEvent::CompleteHrEnhancement { hr_quiz: hr_quiz() }, hr_manager()),
        (JobEvent::RequestCeoApproval, project_leader()),
        (JobEvent::Approve { notes: None }, ceo()),
        (JobEvent::Publish, project_leader()),
    ];
    steps.into_iter().fold(job, |job, (event, actor)| {
        jobs::transition(&job, event, &actor, now).expect("fixture transition")
    })
}

/// A finished result with the given percentage, as the engine would hand it back.
pub(super) fn completed_result(kind: QuizKind, percentage: u8, passing_score: u8) -> AssessmentResult {
    let quiz = Quiz::from_drafts(10, passing_score, [QuestionDraft::text("placeholder", 100)])
        .expect("quiz builds");
    let mut result = AssessmentResult::not_started(kind, &quiz);
    result.status = AssessmentStatus::Completed;
    result.score = u32::from(percentage);
    result.percentage = percentage;
    result.passed = percentage >= passing_score;
    result.started_at = Some(t0());
    result.completed_at = Some(t0());
    result.completion = Some(CompletionReason::Submitted);
    result
}
