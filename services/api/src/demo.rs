use crate::infra::{in_memory_service, ApiService};
use chrono::{Duration, Utc};
use clap::Args;
use hiring_workflow::error::AppError;
use hiring_workflow::workflows::hiring::{
    ActorContext, AnswerValue, Application, ApplicationId, ApplicationStatus,
    ApplicationSubmission, AssessmentResult, Clock, DecisionInput, DecisionVerdict, Job, JobDraft,
    JobPipelineSummary, ManualClock, NotificationEvent, QuestionDraft, QuestionKind, Quiz,
    QuizDefinitionError, QuizImporter, QuizKind, Role, Ticker,
};
use std::path::PathBuf;
use std::sync::Arc;

const TECHNICAL_TIME_LIMIT_MINUTES: u32 = 30;
const TECHNICAL_PASSING_SCORE: u8 = 70;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Option picked for each technical question, in order (e.g. 1,2,0). Missing entries
    /// fall back to the correct option.
    #[arg(long, value_delimiter = ',')]
    pub(crate) technical_answers: Vec<u32>,
    /// Load the technical quiz from a CSV question bank instead of the built-in sample.
    #[arg(long)]
    pub(crate) technical_quiz_csv: Option<PathBuf>,
    /// Reject candidates who fail the technical assessment.
    #[arg(long)]
    pub(crate) hard_gate: bool,
    /// Let the technical countdown run out instead of submitting.
    #[arg(long)]
    pub(crate) let_timer_expire: bool,
}

pub(crate) struct DemoOutcome {
    pub(crate) job: Job,
    pub(crate) application: Application,
    pub(crate) summary: JobPipelineSummary,
    pub(crate) csv: String,
    pub(crate) notifications: Vec<(Role, NotificationEvent)>,
}

struct Cast {
    leader: ActorContext,
    hr: ActorContext,
    ceo: ActorContext,
    candidate: ActorContext,
}

impl Cast {
    fn new() -> Self {
        Self {
            leader: ActorContext::single("pl-demo", Role::ProjectLeader),
            hr: ActorContext::single("hr-demo", Role::Hr),
            ceo: ActorContext::single("ceo-demo", Role::Ceo),
            candidate: ActorContext::single("cand-demo", Role::Candidate),
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let outcome = simulate(&args)?;

    println!("\nPipeline summary for {} ({})", outcome.summary.title, outcome.summary.job_status);
    println!(
        "  Views: {}  Applications: {}",
        outcome.summary.views, outcome.summary.applications
    );
    for entry in &outcome.summary.by_status {
        println!("  {:<20} {}", entry.status_label, entry.count);
    }
    println!(
        "  Technical: {} completed, {} passed, {} expired",
        outcome.summary.technical.completed,
        outcome.summary.technical.passed,
        outcome.summary.technical.expired
    );
    match outcome.summary.average_overall_score {
        Some(score) => println!("  Average overall score: {score}"),
        None => println!("  Average overall score: n/a"),
    }

    println!("\nCSV export");
    print!("{}", outcome.csv);

    println!("\nNotifications");
    if outcome.notifications.is_empty() {
        println!("  none dispatched");
    }
    for (recipient, event) in &outcome.notifications {
        println!("  -> {:<16} {:?}", recipient.label(), event);
    }

    println!(
        "\nJob {} went through {} status changes; application {} finished as {} ({}%).",
        outcome.job.id,
        outcome.job.workflow_history.len(),
        outcome.application.id,
        outcome.application.status.label(),
        outcome.application.progress_percentage()
    );
    Ok(())
}

/// Runs one job and one candidate through the pipeline against in-memory adapters.
pub(crate) fn simulate(args: &DemoArgs) -> Result<DemoOutcome, AppError> {
    let clock = ManualClock::starting_at(Utc::now());
    let (service, outbox) = in_memory_service(Arc::new(clock.clone()));
    let ticker = Ticker::new();
    ticker.subscribe(service.clone());
    let cast = Cast::new();

    let technical_quiz = match &args.technical_quiz_csv {
        Some(path) => {
            QuizImporter::from_path(path, TECHNICAL_TIME_LIMIT_MINUTES, TECHNICAL_PASSING_SCORE)?
        }
        None => sample_technical_quiz()?,
    };
    let hr_quiz = sample_hr_quiz()?;

    println!("Hiring workflow demo");
    println!(
        "Technical quiz: {} questions, {} points, {} minutes, pass at {}%{}",
        technical_quiz.len(),
        technical_quiz.total_points(),
        technical_quiz.time_limit_minutes(),
        technical_quiz.passing_score(),
        if args.hard_gate { " (hard gate)" } else { "" }
    );

    println!("\nJob approval");
    let job = service.create_job(
        JobDraft {
            title: "Senior Rust Engineer".to_string(),
            description: "Own the scheduling engine and its storage layer.".to_string(),
            department: "Platform".to_string(),
            location: "Remote (EU)".to_string(),
            requirements: vec![
                "5+ years of systems programming".to_string(),
                "Production async Rust".to_string(),
            ],
            technical_quiz: Some(technical_quiz.clone()),
            technical_quiz_hard_gate: args.hard_gate,
        },
        &cast.leader,
    )?;
    print_job_step(&job);

    clock.advance(Duration::hours(1));
    let job = service.submit_for_hr_enhancement(&job, &cast.leader)?;
    print_job_step(&job);

    clock.advance(Duration::hours(3));
    let job = service.enhance_with_hr(&job, hr_quiz.clone(), &cast.hr)?;
    print_job_step(&job);

    clock.advance(Duration::minutes(20));
    let job = service.request_ceo_approval(&job, &cast.leader)?;
    print_job_step(&job);

    clock.advance(Duration::hours(2));
    let job = service.approve_job(&job, Some("Budget confirmed for Q3".to_string()), &cast.ceo)?;
    print_job_step(&job);

    let job = service.publish_job(&job, &cast.ceo)?;
    print_job_step(&job);
    service.record_view(&job.id)?;

    println!("\nCandidate journey");
    clock.advance(Duration::days(1));
    let application = service.submit_application(
        &job.id,
        ApplicationSubmission {
            name: "Noor Haddad".to_string(),
            email: "noor.haddad@example.com".to_string(),
            ..ApplicationSubmission::default()
        },
        &cast.candidate,
    )?;
    print_application_step(&application);
    let application_id = application.id.clone();

    service.start_assessment(&application_id, QuizKind::Technical, &cast.candidate)?;
    answer_quiz(
        &service,
        &application_id,
        QuizKind::Technical,
        &technical_quiz,
        &args.technical_answers,
        &cast.candidate,
    )?;

    let technical = if args.let_timer_expire {
        for _ in 0..technical_quiz.time_limit_seconds() {
            clock.advance(Duration::seconds(1));
            ticker.fire(clock.now());
        }
        service.get_application(&application_id)?.technical_assessment
    } else {
        clock.advance(Duration::minutes(12));
        service.submit_assessment(&application_id, QuizKind::Technical, &cast.candidate)?
    };
    print_result(&technical);

    let mut application = service.get_application(&application_id)?;
    print_application_step(&application);

    if application.status == ApplicationStatus::HrReview {
        clock.advance(Duration::hours(2));
        service.start_assessment(&application_id, QuizKind::Hr, &cast.candidate)?;
        answer_quiz(
            &service,
            &application_id,
            QuizKind::Hr,
            &hr_quiz,
            &[],
            &cast.candidate,
        )?;
        clock.advance(Duration::minutes(6));
        let hr = service.submit_assessment(&application_id, QuizKind::Hr, &cast.candidate)?;
        print_result(&hr);
        print_application_step(&service.get_application(&application_id)?);

        clock.advance(Duration::days(2));
        let scheduled = service.schedule_interview(
            &application_id,
            Some("Panel with the platform team".to_string()),
            &cast.hr,
        )?;
        print_application_step(&scheduled);

        clock.advance(Duration::days(3));
        let interviewed = service.complete_interview(
            &application_id,
            Some("Strong systems design discussion".to_string()),
            &cast.leader,
        )?;
        print_application_step(&interviewed);

        let pending = service.request_decision(&application_id, &cast.leader)?;
        print_application_step(&pending);

        clock.advance(Duration::hours(4));
        application = service.record_decision(
            &application_id,
            DecisionVerdict::Accept,
            DecisionInput {
                feedback: Some("Offer approved".to_string()),
                rating: Some(5),
            },
            &cast.leader,
        )?;
        print_application_step(&application);
    } else {
        println!("  Candidate stopped at {}", application.status.label());
    }

    Ok(DemoOutcome {
        job: service.get_job(&job.id)?,
        summary: service.pipeline_summary(&job.id)?,
        csv: service.export_applications_csv(&job.id)?,
        notifications: outbox.events(),
        application,
    })
}

/// Answers every question; `picks` override the best answer per question index.
fn answer_quiz(
    service: &ApiService,
    application_id: &ApplicationId,
    kind: QuizKind,
    quiz: &Quiz,
    picks: &[u32],
    candidate: &ActorContext,
) -> Result<(), AppError> {
    for (index, question) in quiz.questions().iter().enumerate() {
        let answer = match &question.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => {
                AnswerValue::Selected(picks.get(index).copied().unwrap_or(*correct_answer))
            }
            QuestionKind::Rating { scale, target } => AnswerValue::Selected(
                picks
                    .get(index)
                    .copied()
                    .unwrap_or_else(|| target.unwrap_or(*scale)),
            ),
            QuestionKind::Text | QuestionKind::Code { .. } | QuestionKind::Scenario => {
                AnswerValue::Text("Walked through it in the attached notes.".to_string())
            }
        };
        service.record_answer(application_id, kind, question.id, answer, candidate)?;
    }
    Ok(())
}

fn sample_technical_quiz() -> Result<Quiz, QuizDefinitionError> {
    Quiz::from_drafts(
        TECHNICAL_TIME_LIMIT_MINUTES,
        TECHNICAL_PASSING_SCORE,
        [
            QuestionDraft::multiple_choice(
                "Which trait lets a value be sent to another thread?",
                10,
                options(&["Sync", "Send", "Unpin"]),
                1,
            ),
            QuestionDraft::multiple_choice(
                "What does `?` do on an `Err` value?",
                10,
                options(&["Panics", "Ignores it", "Returns it early"]),
                2,
            ),
            QuestionDraft::multiple_choice(
                "Which collection keeps keys sorted?",
                20,
                options(&["BTreeMap", "HashMap", "Vec"]),
                0,
            ),
        ],
    )
}

fn sample_hr_quiz() -> Result<Quiz, QuizDefinitionError> {
    Quiz::from_drafts(
        10,
        60,
        [
            QuestionDraft::multiple_choice(
                "How do you prefer to receive feedback?",
                10,
                options(&["Only at reviews", "Early and often", "Never"]),
                1,
            ),
            QuestionDraft::rating(
                "How comfortable are you mentoring others?",
                10,
                5,
                Some(4),
            ),
        ],
    )
}

fn options(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

fn print_job_step(job: &Job) {
    match job.workflow_history.last() {
        Some(event) => println!(
            "  {:<24} by {} ({}) at {}",
            job.status.label(),
            event.actor_id,
            event.role.label(),
            event.at.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  {:<24} created {}", job.status.label(), job.id),
    }
}

fn print_application_step(application: &Application) {
    println!(
        "  {:<24} progress {:>3}%",
        application.status.label(),
        application.progress_percentage()
    );
}

fn print_result(result: &AssessmentResult) {
    println!(
        "  {} assessment {}: {}/{} ({}%), {}",
        result.kind.as_str(),
        result.status.label(),
        result.score,
        result.max_score,
        result.percentage,
        if result.passed { "passed" } else { "failed" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiring_workflow::workflows::hiring::{CompletionReason, JobStatus};

    #[test]
    fn default_demo_hires_the_candidate() {
        let outcome = simulate(&DemoArgs::default()).expect("demo runs");

        assert_eq!(outcome.job.status, JobStatus::Published);
        assert_eq!(outcome.job.views_count, 1);
        assert_eq!(outcome.application.status, ApplicationStatus::Accepted);
        assert_eq!(outcome.application.progress_percentage(), 100);
        assert_eq!(outcome.application.technical_assessment.percentage, 100);
        assert_eq!(outcome.application.overall_score, Some(100));
        assert!(outcome.csv.lines().nth(1).is_some_and(|row| row.contains("accepted")));
        assert!(matches!(
            outcome.notifications.last(),
            Some((Role::Candidate, NotificationEvent::DecisionRecorded { .. }))
        ));
    }

    #[test]
    fn hard_gate_stops_a_failing_candidate() {
        let args = DemoArgs {
            technical_answers: vec![0, 0, 1],
            hard_gate: true,
            ..DemoArgs::default()
        };

        let outcome = simulate(&args).expect("demo runs");

        assert_eq!(outcome.application.status, ApplicationStatus::Rejected);
        assert!(!outcome.application.technical_assessment.passed);
        assert_eq!(outcome.application.overall_score, None);
        assert_eq!(outcome.summary.technical.completed, 1);
        assert_eq!(outcome.summary.technical.passed, 0);
    }

    #[test]
    fn expired_timer_auto_submits_the_recorded_answers() {
        let args = DemoArgs {
            let_timer_expire: true,
            ..DemoArgs::default()
        };

        let outcome = simulate(&args).expect("demo runs");
        let technical = &outcome.application.technical_assessment;

        assert_eq!(technical.completion, Some(CompletionReason::TimeExpired));
        assert_eq!(technical.percentage, 100);
        assert_eq!(outcome.application.status, ApplicationStatus::Accepted);
    }
}
