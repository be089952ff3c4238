use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use hiring_workflow::workflows::hiring::{
    ActorContext, AnswerValue, Application, ApplicationId, ApplicationRepository,
    ApplicationStatus, ApplicationSubmission, AssessmentStatus, Clock, CompletionReason,
    DecisionInput, DecisionVerdict, HiringService, HiringServiceError, Job, JobDraft, JobId,
    JobRef, JobRepository, JobStatus, ManualClock, NotificationEvent, Notifier, NotifyError,
    QuestionDraft, QuestionId, Quiz, QuizKind, RepositoryError, Role, Ticker, TransitionError,
};

#[derive(Default)]
struct Jobs(Mutex<HashMap<JobId, Job>>);

impl JobRepository for Jobs {
    fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        self.0.lock().unwrap().insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn load(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.0.lock().unwrap().get(id).cloned())
    }

    fn save(&self, job: Job, expected_version: u64) -> Result<(), RepositoryError> {
        let mut records = self.0.lock().unwrap();
        let found = records.get(&job.id).map(|j| j.version).ok_or(RepositoryError::NotFound)?;
        if found != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found,
            });
        }
        records.insert(job.id.clone(), job);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
struct Applications(Mutex<HashMap<ApplicationId, Application>>);

impl ApplicationRepository for Applications {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.0
            .lock()
            .unwrap()
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn load(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.0.lock().unwrap().get(id).cloned())
    }

    fn save(&self, application: Application, expected_version: u64) -> Result<(), RepositoryError> {
        let mut records = self.0.lock().unwrap();
        let found = records
            .get(&application.id)
            .map(|a| a.version)
            .ok_or(RepositoryError::NotFound)?;
        if found != expected_version {
            return Err(RepositoryError::Stale {
                expected: expected_version,
                found,
            });
        }
        records.insert(application.id.clone(), application);
        Ok(())
    }

    fn list_for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .values()
            .filter(|a| &a.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<(Role, NotificationEvent)>>);

impl Notifier for Inbox {
    fn notify(&self, recipient: Role, event: NotificationEvent) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push((recipient, event));
        Ok(())
    }
}

type Service = HiringService<Jobs, Applications, Inbox>;

struct World {
    service: Arc<Service>,
    inbox: Arc<Inbox>,
    clock: ManualClock,
    leader: ActorContext,
    hr: ActorContext,
    ceo: ActorContext,
}

fn world() -> World {
    let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap());
    let inbox = Arc::new(Inbox::default());
    let service = Arc::new(HiringService::with_clock(
        Arc::new(Jobs::default()),
        Arc::new(Applications::default()),
        inbox.clone(),
        Arc::new(clock.clone()),
    ));
    World {
        service,
        inbox,
        clock,
        leader: ActorContext::single("pl-jonas", Role::ProjectLeader),
        hr: ActorContext::single("hr-amara", Role::Hr),
        ceo: ActorContext::single("ceo-rui", Role::Ceo),
    }
}

fn technical_quiz() -> Quiz {
    Quiz::from_drafts(
        2,
        50,
        [
            QuestionDraft::multiple_choice(
                "Which smart pointer is reference counted across threads?",
                10,
                vec!["Rc".into(), "Arc".into(), "Box".into()],
                1,
            ),
            QuestionDraft::text("Sketch a bounded queue", 10),
        ],
    )
    .expect("quiz builds")
}

fn hr_quiz() -> Quiz {
    Quiz::from_drafts(
        5,
        50,
        [QuestionDraft::rating(
            "Rate your comfort with on-call rotations",
            10,
            5,
            Some(5),
        )],
    )
    .expect("quiz builds")
}

fn candidate(id: &str) -> ActorContext {
    ActorContext::single(id, Role::Candidate)
}

fn submission(name: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        ..ApplicationSubmission::default()
    }
}

fn publish(world: &World) -> Job {
    let draft = JobDraft {
        title: "Storage Engineer".to_string(),
        department: "Infrastructure".to_string(),
        technical_quiz: Some(technical_quiz()),
        ..JobDraft::default()
    };
    let job = world.service.create_job(draft, &world.leader).expect("draft created");
    let job = world
        .service
        .submit_for_hr_enhancement(&job, &world.leader)
        .expect("sent to hr");
    let job = world
        .service
        .enhance_with_hr(&job, hr_quiz(), &world.hr)
        .expect("hr quiz attached");
    let job = world
        .service
        .approve_job(&job, None, &world.ceo)
        .expect("approved directly from hr_enhancement_complete");
    world.service.publish_job(&job, &world.leader).expect("published")
}

#[test]
fn two_candidates_take_different_paths_through_one_job() {
    let world = world();
    let job = publish(&world);
    assert_eq!(job.status, JobStatus::Published);
    assert_eq!(job.workflow_history.len(), 4);

    let mira = candidate("cand-mira");
    let tomas = candidate("cand-tomas");
    let first = world
        .service
        .submit_application(&job.id, submission("Mira Sato"), &mira)
        .expect("mira applies");
    let second = world
        .service
        .submit_application(&job.id, submission("Tomas Berg"), &tomas)
        .expect("tomas applies");

    // Mira finishes both assessments and is hired.
    world
        .service
        .start_assessment(&first.id, QuizKind::Technical, &mira)
        .expect("technical started");
    world
        .service
        .record_answer(&first.id, QuizKind::Technical, QuestionId(1), AnswerValue::Selected(1), &mira)
        .expect("answer stored");
    world
        .service
        .record_answer(
            &first.id,
            QuizKind::Technical,
            QuestionId(2),
            AnswerValue::Text("ring buffer with a semaphore".into()),
            &mira,
        )
        .expect("answer stored");
    world.clock.advance(Duration::seconds(45));
    let technical = world
        .service
        .submit_assessment(&first.id, QuizKind::Technical, &mira)
        .expect("technical submitted");
    assert_eq!(technical.percentage, 50, "free text waits for manual review");
    assert_eq!(technical.manual_review, vec![QuestionId(2)]);
    assert!(technical.passed);

    world
        .service
        .start_assessment(&first.id, QuizKind::Hr, &mira)
        .expect("hr started");
    world
        .service
        .record_answer(&first.id, QuizKind::Hr, QuestionId(1), AnswerValue::Selected(5), &mira)
        .expect("rating stored");
    world
        .service
        .submit_assessment(&first.id, QuizKind::Hr, &mira)
        .expect("hr submitted");

    let reviewed = world.service.get_application(&first.id).expect("stored");
    assert_eq!(reviewed.status, ApplicationStatus::UnderReview);
    assert_eq!(reviewed.overall_score, Some(75));

    world
        .service
        .request_decision(&first.id, &world.leader)
        .expect("decision requested straight from under_review");
    let hired = world
        .service
        .record_decision(
            &first.id,
            DecisionVerdict::Accept,
            DecisionInput {
                feedback: Some("Clear thinking under time pressure".into()),
                rating: Some(4),
            },
            &world.leader,
        )
        .expect("accepted");
    assert_eq!(hired.status, ApplicationStatus::Accepted);
    assert_eq!(hired.decision.decided_by.as_ref().map(|id| id.0.as_str()), Some("pl-jonas"));

    // Tomas starts the technical quiz, answers one question and withdraws.
    world
        .service
        .start_assessment(&second.id, QuizKind::Technical, &tomas)
        .expect("technical started");
    world
        .service
        .record_answer(&second.id, QuizKind::Technical, QuestionId(1), AnswerValue::Selected(1), &tomas)
        .expect("answer stored");
    let withdrawn = world
        .service
        .withdraw_application(&second.id, Some("Accepted another offer".into()), &tomas)
        .expect("withdrawn");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
    assert_eq!(withdrawn.technical_assessment.status, AssessmentStatus::Expired);
    assert_eq!(
        withdrawn.technical_assessment.completion,
        Some(CompletionReason::Cancelled)
    );
    assert_eq!(withdrawn.technical_assessment.score, 10);
    assert_eq!(world.service.running_assessments(), 0);

    let summary = world.service.pipeline_summary(&job.id).expect("summary");
    assert_eq!(summary.applications, 2);
    assert_eq!(summary.technical.completed, 1);
    assert_eq!(summary.technical.expired, 1);
    assert_eq!(summary.average_overall_score, Some(75));
    let statuses: Vec<&str> = summary.by_status.iter().map(|e| e.status_label).collect();
    assert_eq!(statuses, vec!["accepted", "withdrawn"]);

    let stored_job = world.service.get_job(&job.id).expect("job");
    assert_eq!(stored_job.applications_count, 2);

    let inbox = world.inbox.0.lock().unwrap();
    assert!(inbox.iter().any(|(role, event)| *role == Role::Candidate
        && matches!(event, NotificationEvent::DecisionRecorded { verdict, .. } if verdict == "accept")));
    assert_eq!(
        inbox
            .iter()
            .filter(|(_, event)| matches!(event, NotificationEvent::ApplicationSubmitted { .. }))
            .count(),
        2
    );
}

#[test]
fn shared_ticker_expires_every_running_attempt_once() {
    let world = world();
    let job = publish(&world);
    let ticker = Ticker::new();
    let subscription = ticker.subscribe(world.service.clone());

    let applicants: Vec<(ActorContext, ApplicationId)> = ["cand-ana", "cand-ben", "cand-cyd"]
        .into_iter()
        .map(|id| {
            let actor = candidate(id);
            let application = world
                .service
                .submit_application(&job.id, submission(id), &actor)
                .expect("applied");
            (actor, application.id)
        })
        .collect();

    for (actor, application_id) in &applicants {
        world
            .service
            .start_assessment(application_id, QuizKind::Technical, actor)
            .expect("started");
    }
    let (paused_actor, paused_id) = &applicants[2];
    assert!(world
        .service
        .pause_assessment(paused_id, QuizKind::Technical, paused_actor)
        .expect("paused"));

    for _ in 0..120 {
        world.clock.advance(Duration::seconds(1));
        ticker.fire(world.clock.now());
    }

    for (_, application_id) in &applicants[..2] {
        let application = world.service.get_application(application_id).expect("stored");
        assert_eq!(application.status, ApplicationStatus::HrReview);
        assert_eq!(
            application.technical_assessment.completion,
            Some(CompletionReason::TimeExpired)
        );
        assert_eq!(application.technical_assessment.percentage, 0);
    }
    assert_eq!(
        world.service.remaining_seconds(paused_id, QuizKind::Technical),
        Some(120),
        "a paused countdown does not move"
    );

    assert!(ticker.unsubscribe(subscription));
    assert_eq!(ticker.fire(world.clock.now()), 0);
    assert_eq!(world.service.running_assessments(), 1);
}

#[test]
fn concurrent_editors_see_stale_writes_instead_of_lost_updates() {
    let world = world();
    let job = world
        .service
        .create_job(
            JobDraft {
                title: "Compiler Engineer".to_string(),
                ..JobDraft::default()
            },
            &world.leader,
        )
        .expect("created");

    let seen_by_both = JobRef::from(&job);
    world
        .service
        .update_technical_quiz(seen_by_both.clone(), technical_quiz(), &world.leader)
        .expect("first editor wins");

    match world
        .service
        .submit_for_hr_enhancement(seen_by_both, &world.leader)
    {
        Err(HiringServiceError::Transition(TransitionError::StaleWrite { expected, found })) => {
            assert_eq!(expected, job.version);
            assert_eq!(found, job.version + 1);
        }
        other => panic!("expected a stale write, got {other:?}"),
    }

    let current = world.service.get_job(&job.id).expect("reload");
    assert_eq!(current.status, JobStatus::Draft);
    assert!(current.has_technical_quiz());
    let submitted = world
        .service
        .submit_for_hr_enhancement(&current, &world.leader)
        .expect("retry against the fresh version");
    assert_eq!(submitted.status, JobStatus::PendingHrEnhancement);
}

#[test]
fn only_publishers_can_publish() {
    let world = world();
    let job = world
        .service
        .create_job(
            JobDraft {
                title: "SRE".to_string(),
                technical_quiz: Some(technical_quiz()),
                ..JobDraft::default()
            },
            &world.leader,
        )
        .expect("created");
    let job = world
        .service
        .submit_for_hr_enhancement(&job, &world.leader)
        .expect("submitted");
    let job = world
        .service
        .enhance_with_hr(&job, hr_quiz(), &world.hr)
        .expect("enhanced");
    let job = world
        .service
        .approve_job(&job, None, &world.ceo)
        .expect("approved");

    for outsider in [world.hr.clone(), candidate("cand-zed"), ActorContext::system()] {
        match world.service.publish_job(&job.id, &outsider) {
            Err(HiringServiceError::Transition(TransitionError::Unauthorized { .. })) => {}
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }
    let published = world
        .service
        .publish_job(&job.id, &world.ceo)
        .expect("ceo may publish");
    assert_eq!(published.status, JobStatus::Published);
}
