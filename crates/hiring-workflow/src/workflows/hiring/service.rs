use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::applications::{
    self, Application, ApplicationEvent, ApplicationStatus, ApplicationSubmission,
    DecisionInput, DecisionVerdict,
};
use super::assessment::{
    AnswerOutcome, AnswerValue, AssessmentEngine, AssessmentError, AssessmentResult,
    AssessmentStatus, QuestionId, Quiz, QuizKind, TickOutcome, TickSubscriber,
};
use super::domain::{
    ActorContext, ApplicationId, Clock, JobId, Role, SystemClock, TransitionError,
};
use super::jobs::{self, Job, JobDraft, JobEvent};
use super::report::{self, JobPipelineSummary, ReportError};
use super::repository::{
    ApplicationRef, ApplicationRepository, JobRef, JobRepository, NotificationEvent, Notifier,
    RepositoryError,
};

/// Attempts made when a write only lost a race on a counter or an assessment result.
const SAVE_ATTEMPTS: usize = 3;

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

type EngineKey = (ApplicationId, QuizKind);

/// Sequences the job and application state machines with persistence, notification, and
/// the running assessment engines.
///
/// Every operation loads the current record, computes the next version in memory, and
/// commits it with a version check. A failed save leaves the stored record as it was.
pub struct HiringService<J, A, N> {
    jobs: Arc<J>,
    applications: Arc<A>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    engines: Mutex<HashMap<EngineKey, AssessmentEngine>>,
}

impl<J, A, N> HiringService<J, A, N>
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(jobs: Arc<J>, applications: Arc<A>, notifier: Arc<N>) -> Self {
        Self::with_clock(jobs, applications, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        jobs: Arc<J>,
        applications: Arc<A>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            applications,
            notifier,
            clock,
            engines: Mutex::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn create_job(
        &self,
        draft: JobDraft,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let job = jobs::create_job(next_job_id(), draft, actor, self.now())?;
        let stored = self.jobs.insert(job)?;
        info!(job_id = %stored.id, actor = %actor.actor_id, "job draft created");
        Ok(stored)
    }

    pub fn get_job(&self, job_id: &JobId) -> Result<Job, HiringServiceError> {
        self.load_job(&JobRef::from(job_id))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, HiringServiceError> {
        let mut jobs = self.jobs.list()?;
        jobs.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(jobs)
    }

    pub fn submit_for_hr_enhancement(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let job = self.advance_job(job.into(), JobEvent::SubmitForHrEnhancement, actor)?;
        self.notify(
            Role::Hr,
            NotificationEvent::JobSubmittedForHr {
                job_id: job.id.clone(),
            },
        );
        Ok(job)
    }

    pub fn enhance_with_hr(
        &self,
        job: impl Into<JobRef>,
        hr_quiz: Quiz,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let job = self.advance_job(
            job.into(),
            JobEvent::CompleteHrEnhancement { hr_quiz },
            actor,
        )?;
        self.notify(
            Role::Ceo,
            NotificationEvent::HrEnhancementCompleted {
                job_id: job.id.clone(),
            },
        );
        Ok(job)
    }

    pub fn update_technical_quiz(
        &self,
        job: impl Into<JobRef>,
        quiz: Quiz,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let loaded = self.load_job(&job.into())?;
        let next = jobs::replace_technical_quiz(&loaded, quiz, actor, self.now())?;
        let committed = self.commit_job(&loaded, next)?;
        info!(job_id = %committed.id, "technical quiz replaced");
        Ok(committed)
    }

    pub fn request_ceo_approval(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let job = self.advance_job(job.into(), JobEvent::RequestCeoApproval, actor)?;
        self.notify(
            Role::Ceo,
            NotificationEvent::CeoApprovalRequested {
                job_id: job.id.clone(),
            },
        );
        Ok(job)
    }

    pub fn approve_job(
        &self,
        job: impl Into<JobRef>,
        notes: Option<String>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let job = self.advance_job(job.into(), JobEvent::Approve { notes }, actor)?;
        self.notify(
            Role::ProjectLeader,
            NotificationEvent::JobApproved {
                job_id: job.id.clone(),
            },
        );
        Ok(job)
    }

    pub fn reject_job(
        &self,
        job: impl Into<JobRef>,
        feedback: impl Into<String>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let feedback = feedback.into();
        let job = self.advance_job(
            job.into(),
            JobEvent::Reject {
                feedback: feedback.clone(),
            },
            actor,
        )?;
        self.notify(
            Role::ProjectLeader,
            NotificationEvent::JobRejected {
                job_id: job.id.clone(),
                feedback,
            },
        );
        Ok(job)
    }

    pub fn publish_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        self.advance_job(job.into(), JobEvent::Publish, actor)
    }

    pub fn pause_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        self.advance_job(job.into(), JobEvent::Pause, actor)
    }

    pub fn resume_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        self.advance_job(job.into(), JobEvent::Resume, actor)
    }

    /// Closes the posting and cancels every assessment still running against it.
    pub fn close_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let closed = self.advance_job(job.into(), JobEvent::Close, actor)?;
        self.cancel_assessments_for_job(&closed.id);
        Ok(closed)
    }

    pub fn archive_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        self.advance_job(job.into(), JobEvent::Archive, actor)
    }

    /// Opens a new draft from a rejected job; the rejected record is left untouched.
    pub fn revise_rejected_job(
        &self,
        job: impl Into<JobRef>,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let rejected = self.load_job(&job.into())?;
        let revised = jobs::revise_rejected(&rejected, next_job_id(), actor, self.now())?;
        let stored = self.jobs.insert(revised)?;
        info!(
            job_id = %stored.id,
            revision_of = %rejected.id,
            "revised draft created from rejected job"
        );
        Ok(stored)
    }

    pub fn record_view(&self, job_id: &JobId) -> Result<Job, HiringServiceError> {
        let now = self.now();
        self.update_job_with_retry(job_id, |job| jobs::record_view(job, now))
    }

    pub fn submit_application(
        &self,
        job_id: &JobId,
        submission: ApplicationSubmission,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        let now = self.now();
        let job = self.load_job(&JobRef::from(job_id))?;
        let application =
            applications::open_application(next_application_id(), &job, submission, actor, now)?;
        let stored = self.applications.insert(application)?;

        if let Err(err) =
            self.update_job_with_retry(job_id, |job| Ok(jobs::count_application(job, now)))
        {
            warn!(job_id = %job_id, error = %err, "failed to bump applications count");
        }

        info!(
            application_id = %stored.id,
            job_id = %job_id,
            candidate = %actor.actor_id,
            "application submitted"
        );
        self.notify(
            Role::ProjectLeader,
            NotificationEvent::ApplicationSubmitted {
                job_id: job_id.clone(),
                application_id: stored.id.clone(),
            },
        );
        Ok(stored)
    }

    pub fn get_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, HiringServiceError> {
        self.load_application(&ApplicationRef::from(application_id))
    }

    pub fn list_applications(&self, job_id: &JobId) -> Result<Vec<Application>, HiringServiceError> {
        self.load_job(&JobRef::from(job_id))?;
        let mut applications = self.applications.list_for_job(job_id)?;
        applications.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(applications)
    }

    pub fn schedule_interview(
        &self,
        application: impl Into<ApplicationRef>,
        notes: Option<String>,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        self.advance_application(
            application.into(),
            ApplicationEvent::ScheduleInterview { notes },
            actor,
        )
    }

    pub fn complete_interview(
        &self,
        application: impl Into<ApplicationRef>,
        notes: Option<String>,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        self.advance_application(
            application.into(),
            ApplicationEvent::CompleteInterview { notes },
            actor,
        )
    }

    pub fn request_decision(
        &self,
        application: impl Into<ApplicationRef>,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        let application =
            self.advance_application(application.into(), ApplicationEvent::RequestDecision, actor)?;
        self.notify(
            Role::ProjectLeader,
            NotificationEvent::DecisionPending {
                job_id: application.job_id.clone(),
                application_id: application.id.clone(),
            },
        );
        Ok(application)
    }

    pub fn record_decision(
        &self,
        application: impl Into<ApplicationRef>,
        verdict: DecisionVerdict,
        input: DecisionInput,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        let event = match verdict {
            DecisionVerdict::Accept => ApplicationEvent::Accept(input),
            DecisionVerdict::Reject => ApplicationEvent::Reject(input),
            DecisionVerdict::Pending => return Err(HiringServiceError::UndecidedVerdict),
        };
        let application = self.advance_application(application.into(), event, actor)?;
        self.notify(
            Role::Candidate,
            NotificationEvent::DecisionRecorded {
                application_id: application.id.clone(),
                candidate_id: application.candidate.candidate_id.clone(),
                verdict: verdict.label().to_string(),
            },
        );
        Ok(application)
    }

    /// Withdraws the application, keeping and scoring whatever the candidate had answered.
    pub fn withdraw_application(
        &self,
        application: impl Into<ApplicationRef>,
        reason: Option<String>,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        let loaded = self.load_application(&application.into())?;
        let job = self.load_job(&JobRef::from(&loaded.job_id))?;
        let now = self.now();
        let mut next = applications::transition(
            &loaded,
            &job,
            ApplicationEvent::Withdraw { reason },
            actor,
            now,
        )?;

        // Held across the commit so the countdown cannot finish an engine we are cancelling.
        let mut engines = self.engines();
        let keys = engine_keys(&loaded.id);
        for key in &keys {
            if let Some(engine) = engines.get(key) {
                // An unsettled engine hands back its frozen result instead of a new one.
                let mut cancelled = engine.clone();
                if let Some(completion) = cancelled.cancel(now) {
                    next = applications::record_assessment(&next, completion.into_result(), now);
                }
            }
        }

        let committed = self.commit_application(&loaded, next)?;
        for key in &keys {
            engines.remove(key);
        }
        drop(engines);

        info!(application_id = %committed.id, "application withdrawn");
        Ok(committed)
    }

    /// Opens a timed attempt. Starting the technical quiz also moves the application into
    /// `technical_review`.
    pub fn start_assessment(
        &self,
        application: impl Into<ApplicationRef>,
        kind: QuizKind,
        actor: &ActorContext,
    ) -> Result<AssessmentResult, HiringServiceError> {
        let loaded = self.load_application(&application.into())?;
        let job = self.load_job(&JobRef::from(&loaded.job_id))?;
        let now = self.now();

        if loaded.assessment(kind).status != AssessmentStatus::NotStarted {
            return Err(AssessmentError::AlreadyStarted.into());
        }
        // Paused and closed postings take no new attempts; closing already cancelled the
        // running ones.
        if !job.is_accepting_applications() {
            return Err(TransitionError::JobNotPublished {
                status: job.status.label(),
            }
            .into());
        }

        let base = match kind {
            QuizKind::Technical => applications::transition(
                &loaded,
                &job,
                ApplicationEvent::StartTechnicalAssessment,
                actor,
                now,
            )?,
            QuizKind::Hr => {
                ensure_candidate(&loaded, actor)?;
                match loaded.status {
                    ApplicationStatus::HrReview => loaded.clone(),
                    ApplicationStatus::Submitted | ApplicationStatus::TechnicalReview => {
                        return Err(TransitionError::AssessmentPending {
                            kind: QuizKind::Technical.as_str(),
                        }
                        .into())
                    }
                    other => {
                        return Err(TransitionError::RecordLocked {
                            status: other.label(),
                        }
                        .into())
                    }
                }
            }
        };

        let quiz = quiz_for(&job, kind)?;
        let mut engine = AssessmentEngine::new(kind, quiz.clone());
        let started = engine.start(now)?.clone();
        let next = applications::record_assessment(&base, started.clone(), now);

        let mut engines = self.engines();
        let key = (loaded.id.clone(), kind);
        if engines.contains_key(&key) {
            return Err(AssessmentError::AlreadyStarted.into());
        }
        self.commit_application(&loaded, next)?;
        engines.insert(key, engine);
        drop(engines);

        info!(
            application_id = %loaded.id,
            kind = kind.as_str(),
            time_limit_seconds = quiz.time_limit_seconds(),
            "assessment started"
        );
        Ok(started)
    }

    pub fn record_answer(
        &self,
        application_id: &ApplicationId,
        kind: QuizKind,
        question_id: QuestionId,
        answer: AnswerValue,
        actor: &ActorContext,
    ) -> Result<AnswerOutcome, HiringServiceError> {
        let application = self.get_application(application_id)?;
        ensure_candidate(&application, actor)?;

        let mut engines = self.engines();
        match engines.get_mut(&(application_id.clone(), kind)) {
            Some(engine) => Ok(engine.record_answer(question_id, answer)?),
            None if application.assessment(kind).status.is_finished() => {
                Ok(AnswerOutcome::IgnoredFinished)
            }
            None => Err(AssessmentError::NotStarted.into()),
        }
    }

    /// Candidate-initiated submission. Late or repeated calls return the stored result.
    ///
    /// A finished engine stays registered until its result is stored, so a submission
    /// that failed to save can be repeated and re-persists the same frozen result.
    pub fn submit_assessment(
        &self,
        application_id: &ApplicationId,
        kind: QuizKind,
        actor: &ActorContext,
    ) -> Result<AssessmentResult, HiringServiceError> {
        let application = self.get_application(application_id)?;
        ensure_candidate(&application, actor)?;
        let now = self.now();

        let key = (application_id.clone(), kind);
        let completion = match self.engines().get_mut(&key) {
            Some(engine) => Some(engine.submit(now)?),
            None => None,
        };

        match completion {
            Some(completion) => self.settle(&key, completion.into_result(), actor, now),
            None => {
                let existing = application.assessment(kind);
                if existing.status.is_finished() {
                    Ok(existing.clone())
                } else {
                    Err(AssessmentError::NotStarted.into())
                }
            }
        }
    }

    /// Freezes the countdown; returns `false` when it was already paused.
    pub fn pause_assessment(
        &self,
        application_id: &ApplicationId,
        kind: QuizKind,
        actor: &ActorContext,
    ) -> Result<bool, HiringServiceError> {
        self.with_running_engine(application_id, kind, actor, AssessmentEngine::pause)
    }

    pub fn resume_assessment(
        &self,
        application_id: &ApplicationId,
        kind: QuizKind,
        actor: &ActorContext,
    ) -> Result<bool, HiringServiceError> {
        self.with_running_engine(application_id, kind, actor, AssessmentEngine::resume)
    }

    /// Seconds left on a running attempt, if one is running.
    pub fn remaining_seconds(&self, application_id: &ApplicationId, kind: QuizKind) -> Option<u32> {
        self.engines()
            .get(&(application_id.clone(), kind))
            .filter(|engine| !engine.status().is_finished())
            .map(AssessmentEngine::remaining_seconds)
    }

    /// Attempts whose countdown is still live.
    pub fn running_assessments(&self) -> usize {
        self.engines()
            .values()
            .filter(|engine| !engine.status().is_finished())
            .count()
    }

    /// Finished attempts whose result has not been stored yet.
    pub fn unsettled_assessments(&self) -> usize {
        self.engines()
            .values()
            .filter(|engine| engine.status().is_finished())
            .count()
    }

    /// Advances every running countdown by one second and commits any auto-submissions.
    /// Results that an earlier tick or submission failed to store are retried as well.
    /// Returns how many countdowns expired on this tick.
    pub fn tick(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        let finished: Vec<(EngineKey, AssessmentResult)> = {
            let mut engines = self.engines();
            let mut finished = Vec::new();
            for (key, engine) in engines.iter_mut() {
                match engine.tick(now) {
                    TickOutcome::AutoSubmitted(result) => {
                        info!(
                            application_id = %key.0,
                            kind = result.kind.as_str(),
                            score = result.score,
                            "assessment time expired; answers auto-submitted"
                        );
                        expired += 1;
                        finished.push((key.clone(), result));
                    }
                    TickOutcome::Idle if engine.status().is_finished() => {
                        finished.push((key.clone(), engine.result().clone()));
                    }
                    _ => {}
                }
            }
            finished
        };

        let system = ActorContext::system();
        for (key, result) in finished {
            if let Err(err) = self.settle(&key, result, &system, now) {
                warn!(
                    application_id = %key.0,
                    error = %err,
                    "failed to store finished assessment; retrying on the next tick"
                );
            }
        }
        expired
    }

    pub fn pipeline_summary(&self, job_id: &JobId) -> Result<JobPipelineSummary, HiringServiceError> {
        let job = self.get_job(job_id)?;
        let applications = self.applications.list_for_job(job_id)?;
        Ok(report::summarize(&job, &applications))
    }

    pub fn export_applications_csv(&self, job_id: &JobId) -> Result<String, HiringServiceError> {
        let applications = self.list_applications(job_id)?;
        Ok(report::export_csv(&applications)?)
    }

    fn engines(&self) -> MutexGuard<'_, HashMap<EngineKey, AssessmentEngine>> {
        self.engines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_job(&self, job: &JobRef) -> Result<Job, HiringServiceError> {
        let current = self
            .jobs
            .load(&job.id)?
            .ok_or_else(|| HiringServiceError::JobNotFound(job.id.clone()))?;
        check_version(job.version, current.version)?;
        Ok(current)
    }

    fn commit_job(&self, loaded: &Job, next: Job) -> Result<Job, HiringServiceError> {
        self.jobs.save(next.clone(), loaded.version)?;
        Ok(next)
    }

    fn advance_job(
        &self,
        job: JobRef,
        event: JobEvent,
        actor: &ActorContext,
    ) -> Result<Job, HiringServiceError> {
        let loaded = self.load_job(&job)?;
        let next = jobs::transition(&loaded, event, actor, self.now())?;
        let committed = self.commit_job(&loaded, next)?;
        info!(
            job_id = %committed.id,
            from = loaded.status.label(),
            to = committed.status.label(),
            version = committed.version,
            "job transition committed"
        );
        Ok(committed)
    }

    fn update_job_with_retry<F>(&self, job_id: &JobId, update: F) -> Result<Job, HiringServiceError>
    where
        F: Fn(&Job) -> Result<Job, TransitionError>,
    {
        let mut attempt = 1;
        loop {
            let loaded = self.load_job(&JobRef::from(job_id))?;
            let next = update(&loaded)?;
            match self.jobs.save(next.clone(), loaded.version) {
                Ok(()) => return Ok(next),
                Err(RepositoryError::Stale { .. }) if attempt < SAVE_ATTEMPTS => {
                    debug!(job_id = %job_id, attempt, "job changed underneath counter update; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn load_application(
        &self,
        application: &ApplicationRef,
    ) -> Result<Application, HiringServiceError> {
        let current = self
            .applications
            .load(&application.id)?
            .ok_or_else(|| HiringServiceError::ApplicationNotFound(application.id.clone()))?;
        check_version(application.version, current.version)?;
        Ok(current)
    }

    fn commit_application(
        &self,
        loaded: &Application,
        next: Application,
    ) -> Result<Application, HiringServiceError> {
        self.applications.save(next.clone(), loaded.version)?;
        Ok(next)
    }

    fn advance_application(
        &self,
        application: ApplicationRef,
        event: ApplicationEvent,
        actor: &ActorContext,
    ) -> Result<Application, HiringServiceError> {
        let loaded = self.load_application(&application)?;
        let job = self.load_job(&JobRef::from(&loaded.job_id))?;
        let next = applications::transition(&loaded, &job, event, actor, self.now())?;
        let committed = self.commit_application(&loaded, next)?;
        info!(
            application_id = %committed.id,
            from = loaded.status.label(),
            to = committed.status.label(),
            version = committed.version,
            "application transition committed"
        );
        Ok(committed)
    }

    /// Stores a finished result and only then drops its engine. On failure the engine
    /// keeps the frozen result so the next submit or tick can store it again.
    fn settle(
        &self,
        key: &EngineKey,
        result: AssessmentResult,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, HiringServiceError> {
        let stored = self.persist_result(&key.0, result, actor, now)?;
        let mut engines = self.engines();
        if engines
            .get(key)
            .is_some_and(|engine| engine.status().is_finished())
        {
            engines.remove(key);
        }
        Ok(stored)
    }

    /// Stores a freshly finished result and moves the application past the matching
    /// review stage. The engine already froze the result, so a lost race is retried.
    fn persist_result(
        &self,
        application_id: &ApplicationId,
        result: AssessmentResult,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, HiringServiceError> {
        let kind = result.kind;
        let mut attempt = 1;
        loop {
            let current = self.get_application(application_id)?;
            if current.assessment(kind).status.is_finished() {
                return Ok(current.assessment(kind).clone());
            }
            let job = self.load_job(&JobRef::from(&current.job_id))?;

            let recorded = applications::record_assessment(&current, result.clone(), now);
            let advanced = auto_advance(&recorded, &job, &result, actor, now);

            match self.applications.save(advanced.clone(), current.version) {
                Ok(()) => {
                    if advanced.status == ApplicationStatus::UnderReview
                        && current.status == ApplicationStatus::HrReview
                    {
                        self.notify(
                            Role::ProjectLeader,
                            NotificationEvent::AssessmentsCompleted {
                                job_id: advanced.job_id.clone(),
                                application_id: advanced.id.clone(),
                            },
                        );
                    }
                    info!(
                        application_id = %application_id,
                        kind = kind.as_str(),
                        percentage = result.percentage,
                        passed = result.passed,
                        status = advanced.status.label(),
                        "assessment result stored"
                    );
                    return Ok(result);
                }
                Err(RepositoryError::Stale { .. }) if attempt < SAVE_ATTEMPTS => {
                    debug!(application_id = %application_id, attempt, "retrying assessment result write");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn cancel_assessments_for_job(&self, job_id: &JobId) {
        let applications = match self.applications.list_for_job(job_id) {
            Ok(applications) => applications,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "could not list applications to cancel assessments");
                return;
            }
        };

        let now = self.now();
        let cancelled: Vec<(EngineKey, AssessmentResult)> = {
            let mut engines = self.engines();
            applications
                .iter()
                .flat_map(|application| engine_keys(&application.id))
                .filter_map(|key| {
                    let completion = engines.get_mut(&key)?.cancel(now)?;
                    Some((key, completion.into_result()))
                })
                .collect()
        };

        let system = ActorContext::system();
        for (key, result) in cancelled {
            if let Err(err) = self.settle(&key, result, &system, now) {
                warn!(
                    application_id = %key.0,
                    error = %err,
                    "failed to store cancelled assessment; retrying on the next tick"
                );
            }
        }
    }

    fn with_running_engine(
        &self,
        application_id: &ApplicationId,
        kind: QuizKind,
        actor: &ActorContext,
        apply: fn(&mut AssessmentEngine) -> bool,
    ) -> Result<bool, HiringServiceError> {
        let application = self.get_application(application_id)?;
        ensure_candidate(&application, actor)?;

        let mut engines = self.engines();
        match engines.get_mut(&(application_id.clone(), kind)) {
            Some(engine) => Ok(apply(engine)),
            None if application.assessment(kind).status.is_finished() => Ok(false),
            None => Err(AssessmentError::NotStarted.into()),
        }
    }

    fn notify(&self, recipient: Role, event: NotificationEvent) {
        if let Err(err) = self.notifier.notify(recipient, event) {
            warn!(
                recipient = recipient.as_str(),
                error = %err,
                "notification failed; transition already committed"
            );
        }
    }
}

impl<J, A, N> TickSubscriber for HiringService<J, A, N>
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    fn on_tick(&self, now: DateTime<Utc>) {
        self.tick(now);
    }
}

/// Moves the application on once an assessment completes; leaves it in place otherwise.
fn auto_advance(
    application: &Application,
    job: &Job,
    result: &AssessmentResult,
    actor: &ActorContext,
    now: DateTime<Utc>,
) -> Application {
    if !result.is_completed() {
        return application.clone();
    }

    let (event, actor) = match (result.kind, application.status) {
        (QuizKind::Technical, ApplicationStatus::TechnicalReview) => {
            if job.technical_quiz_hard_gate && !result.passed {
                (ApplicationEvent::FailTechnicalGate, ActorContext::system())
            } else {
                (ApplicationEvent::AdvanceToHrReview, actor.clone())
            }
        }
        (QuizKind::Hr, ApplicationStatus::HrReview) => {
            (ApplicationEvent::AdvanceToUnderReview, actor.clone())
        }
        _ => return application.clone(),
    };

    match applications::transition(application, job, event, &actor, now) {
        Ok(next) => next,
        Err(err) => {
            warn!(
                application_id = %application.id,
                error = %err,
                "assessment completed but the application could not advance"
            );
            application.clone()
        }
    }
}

fn engine_keys(application_id: &ApplicationId) -> [EngineKey; 2] {
    [
        (application_id.clone(), QuizKind::Technical),
        (application_id.clone(), QuizKind::Hr),
    ]
}

fn quiz_for(job: &Job, kind: QuizKind) -> Result<&Quiz, HiringServiceError> {
    let (quiz, field) = match kind {
        QuizKind::Technical => (job.technical_quiz.as_ref(), "technical_quiz"),
        QuizKind::Hr => (job.hr_quiz.as_ref(), "hr_quiz"),
    };
    quiz.ok_or(HiringServiceError::Transition(TransitionError::IncompleteJob { field }))
}

fn ensure_candidate(application: &Application, actor: &ActorContext) -> Result<(), TransitionError> {
    if actor.has_role(Role::Candidate) && application.is_owned_by(&actor.actor_id) {
        Ok(())
    } else {
        warn!(
            target: "security",
            actor = %actor.actor_id,
            application_id = %application.id,
            "assessment access by someone other than the candidate"
        );
        Err(TransitionError::CandidateMismatch {
            actor: actor.actor_id.clone(),
        })
    }
}

fn check_version(expected: Option<u64>, found: u64) -> Result<(), TransitionError> {
    match expected {
        Some(expected) if expected != found => Err(TransitionError::StaleWrite { expected, found }),
        _ => Ok(()),
    }
}

/// Error raised by the hiring service.
#[derive(Debug, thiserror::Error)]
pub enum HiringServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("a decision must either accept or reject")]
    UndecidedVerdict,
}

impl From<RepositoryError> for HiringServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Stale { expected, found } => {
                Self::Transition(TransitionError::StaleWrite { expected, found })
            }
            other => Self::Repository(other),
        }
    }
}

impl HiringServiceError {
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            HiringServiceError::Transition(TransitionError::StaleWrite { .. })
        )
    }
}
