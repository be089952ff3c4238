use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::applications::{Application, ApplicationSubmission, DecisionInput, DecisionVerdict};
use super::assessment::{AnswerOutcome, AnswerValue, AssessmentError, QuestionId, Quiz, QuizKind};
use super::domain::{ActorContext, ApplicationId, JobId, Role, TransitionError};
use super::jobs::JobDraft;
use super::repository::{
    ApplicationRef, ApplicationRepository, JobRef, JobRepository, Notifier, RepositoryError,
};
use super::service::{HiringService, HiringServiceError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";

type Shared<J, A, N> = State<Arc<HiringService<J, A, N>>>;
type HandlerResult = Result<Response, HiringApiError>;

/// Router exposing the job pipeline, applications, and assessments.
///
/// Callers identify themselves with `x-actor-id` and a comma separated `x-actor-roles`
/// header. Write endpoints honour `If-Match: <version>` for optimistic concurrency.
pub fn hiring_router<J, A, N>(service: Arc<HiringService<J, A, N>>) -> Router
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/jobs",
            get(list_jobs_handler::<J, A, N>).post(create_job_handler::<J, A, N>),
        )
        .route("/api/v1/jobs/:job_id", get(job_handler::<J, A, N>))
        .route(
            "/api/v1/jobs/:job_id/submit",
            post(submit_job_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/hr-enhancement",
            post(hr_enhancement_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/technical-quiz",
            put(technical_quiz_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/approval-request",
            post(approval_request_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/approve",
            post(approve_handler::<J, A, N>),
        )
        .route("/api/v1/jobs/:job_id/reject", post(reject_handler::<J, A, N>))
        .route(
            "/api/v1/jobs/:job_id/publish",
            post(publish_handler::<J, A, N>),
        )
        .route("/api/v1/jobs/:job_id/pause", post(pause_handler::<J, A, N>))
        .route(
            "/api/v1/jobs/:job_id/resume",
            post(resume_handler::<J, A, N>),
        )
        .route("/api/v1/jobs/:job_id/close", post(close_handler::<J, A, N>))
        .route(
            "/api/v1/jobs/:job_id/archive",
            post(archive_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/revise",
            post(revise_handler::<J, A, N>),
        )
        .route("/api/v1/jobs/:job_id/views", post(view_handler::<J, A, N>))
        .route(
            "/api/v1/jobs/:job_id/applications",
            get(list_applications_handler::<J, A, N>).post(submit_application_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/report",
            get(report_handler::<J, A, N>),
        )
        .route(
            "/api/v1/jobs/:job_id/export",
            get(export_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/assessments/:kind/start",
            post(start_assessment_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/assessments/:kind/answers/:question_id",
            put(answer_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/assessments/:kind/submit",
            post(submit_assessment_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/assessments/:kind/pause",
            post(pause_assessment_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/assessments/:kind/resume",
            post(resume_assessment_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/interview",
            post(schedule_interview_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/interview/complete",
            post(complete_interview_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/decision-request",
            post(decision_request_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decision_handler::<J, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<J, A, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct HrEnhancementRequest {
    pub(crate) hr_quiz: Quiz,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TechnicalQuizRequest {
    pub(crate) quiz: Quiz,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotesRequest {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) feedback: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) answer: AnswerValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) verdict: DecisionVerdict,
    #[serde(flatten)]
    pub(crate) input: DecisionInput,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WithdrawRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApplicationEnvelope<'a> {
    #[serde(flatten)]
    application: &'a Application,
    progress_percentage: u8,
}

#[derive(Debug, Serialize)]
struct AnswerEnvelope {
    recorded: bool,
}

pub(crate) async fn create_job_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<JobDraft>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.create_job(draft, &actor)?;
    Ok(json_response(StatusCode::CREATED, &job))
}

pub(crate) async fn list_jobs_handler<J, A, N>(State(service): Shared<J, A, N>) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let jobs = service.list_jobs()?;
    Ok(json_response(StatusCode::OK, &jobs))
}

pub(crate) async fn job_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let job = service.get_job(&JobId(job_id))?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn submit_job_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.submit_for_hr_enhancement(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn hr_enhancement_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<HrEnhancementRequest>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.enhance_with_hr(job_ref(job_id, &headers)?, request.hr_quiz, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn technical_quiz_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<TechnicalQuizRequest>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.update_technical_quiz(job_ref(job_id, &headers)?, request.quiz, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn approval_request_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.request_ceo_approval(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn approve_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let request: NotesRequest = optional_body(&body)?;
    let job = service.approve_job(job_ref(job_id, &headers)?, request.notes, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn reject_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<RejectRequest>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.reject_job(job_ref(job_id, &headers)?, request.feedback, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn publish_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.publish_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn pause_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.pause_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn resume_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.resume_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn close_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.close_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn archive_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.archive_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::OK, &job))
}

pub(crate) async fn revise_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let job = service.revise_rejected_job(job_ref(job_id, &headers)?, &actor)?;
    Ok(json_response(StatusCode::CREATED, &job))
}

pub(crate) async fn view_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let job = service.record_view(&JobId(job_id))?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "job_id": job.id, "views_count": job.views_count }),
    ))
}

pub(crate) async fn list_applications_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let views: Vec<_> = service
        .list_applications(&JobId(job_id))?
        .iter()
        .map(Application::view)
        .collect();
    Ok(json_response(StatusCode::OK, &views))
}

pub(crate) async fn submit_application_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let application = service.submit_application(&JobId(job_id), submission, &actor)?;
    Ok(application_response(StatusCode::CREATED, &application))
}

pub(crate) async fn report_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let summary = service.pipeline_summary(&JobId(job_id))?;
    Ok(json_response(StatusCode::OK, &summary))
}

pub(crate) async fn export_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(job_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let csv = service.export_applications_csv(&JobId(job_id))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))],
        csv,
    )
        .into_response())
}

pub(crate) async fn application_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let application = service.get_application(&ApplicationId(application_id))?;
    Ok(application_response(StatusCode::OK, &application))
}

pub(crate) async fn start_assessment_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path((application_id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let kind = parse_kind(&kind)?;
    let result = service.start_assessment(application_ref(application_id, &headers)?, kind, &actor)?;
    Ok(json_response(StatusCode::OK, &result))
}

pub(crate) async fn answer_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path((application_id, kind, question_id)): Path<(String, String, u32)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let kind = parse_kind(&kind)?;
    let outcome = service.record_answer(
        &ApplicationId(application_id),
        kind,
        QuestionId(question_id),
        request.answer,
        &actor,
    )?;
    let recorded = outcome == AnswerOutcome::Recorded;
    Ok(json_response(StatusCode::OK, &AnswerEnvelope { recorded }))
}

pub(crate) async fn submit_assessment_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path((application_id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let kind = parse_kind(&kind)?;
    let result = service.submit_assessment(&ApplicationId(application_id), kind, &actor)?;
    Ok(json_response(StatusCode::OK, &result))
}

pub(crate) async fn pause_assessment_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path((application_id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let kind = parse_kind(&kind)?;
    let changed = service.pause_assessment(&ApplicationId(application_id), kind, &actor)?;
    Ok(json_response(StatusCode::OK, &json!({ "paused": true, "changed": changed })))
}

pub(crate) async fn resume_assessment_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path((application_id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let kind = parse_kind(&kind)?;
    let changed = service.resume_assessment(&ApplicationId(application_id), kind, &actor)?;
    Ok(json_response(StatusCode::OK, &json!({ "paused": false, "changed": changed })))
}

pub(crate) async fn schedule_interview_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let request: NotesRequest = optional_body(&body)?;
    let application = service.schedule_interview(
        application_ref(application_id, &headers)?,
        request.notes,
        &actor,
    )?;
    Ok(application_response(StatusCode::OK, &application))
}

pub(crate) async fn complete_interview_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let request: NotesRequest = optional_body(&body)?;
    let application = service.complete_interview(
        application_ref(application_id, &headers)?,
        request.notes,
        &actor,
    )?;
    Ok(application_response(StatusCode::OK, &application))
}

pub(crate) async fn decision_request_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let application = service.request_decision(application_ref(application_id, &headers)?, &actor)?;
    Ok(application_response(StatusCode::OK, &application))
}

pub(crate) async fn decision_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let application = service.record_decision(
        application_ref(application_id, &headers)?,
        request.verdict,
        request.input,
        &actor,
    )?;
    Ok(application_response(StatusCode::OK, &application))
}

pub(crate) async fn withdraw_handler<J, A, N>(
    State(service): Shared<J, A, N>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult
where
    J: JobRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let request: WithdrawRequest = optional_body(&body)?;
    let application = service.withdraw_application(
        application_ref(application_id, &headers)?,
        request.reason,
        &actor,
    )?;
    Ok(application_response(StatusCode::OK, &application))
}

/// Reads the acting identity from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<ActorContext, HiringApiError> {
    let actor_id = header_str(headers, ACTOR_ID_HEADER)
        .filter(|value| !value.is_empty())
        .ok_or(HiringApiError::MissingActor)?;
    let roles = header_str(headers, ACTOR_ROLES_HEADER).unwrap_or_default();

    let roles = roles
        .split(',')
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| HiringApiError::BadRequest(err.to_string()))?;

    Ok(ActorContext::new(actor_id, roles))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

fn expected_version(headers: &HeaderMap) -> Result<Option<u64>, HiringApiError> {
    match header_str(headers, header::IF_MATCH.as_str()) {
        None => Ok(None),
        Some(raw) => raw
            .trim_matches('"')
            .parse::<u64>()
            .map(Some)
            .map_err(|_| HiringApiError::BadRequest(format!("If-Match must be a version number, got '{raw}'"))),
    }
}

fn job_ref(job_id: String, headers: &HeaderMap) -> Result<JobRef, HiringApiError> {
    Ok(JobRef {
        id: JobId(job_id),
        version: expected_version(headers)?,
    })
}

fn application_ref(
    application_id: String,
    headers: &HeaderMap,
) -> Result<ApplicationRef, HiringApiError> {
    Ok(ApplicationRef {
        id: ApplicationId(application_id),
        version: expected_version(headers)?,
    })
}

fn parse_kind(raw: &str) -> Result<QuizKind, HiringApiError> {
    QuizKind::parse(raw)
        .ok_or_else(|| HiringApiError::BadRequest(format!("unknown assessment type '{raw}'")))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, axum::Json(body)).into_response()
}

fn application_response(status: StatusCode, application: &Application) -> Response {
    json_response(
        status,
        &ApplicationEnvelope {
            application,
            progress_percentage: application.progress_percentage(),
        },
    )
}

/// Parses a body whose fields are all optional. An empty body means "no fields"; anything
/// else must be valid JSON.
fn optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, HiringApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| HiringApiError::BadRequest(format!("invalid request body: {err}")))
}

/// Errors surfaced by the HTTP layer before or after reaching the service.
#[derive(Debug, thiserror::Error)]
pub enum HiringApiError {
    #[error("missing x-actor-id header")]
    MissingActor,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Service(#[from] HiringServiceError),
}

impl IntoResponse for HiringApiError {
    fn into_response(self) -> Response {
        match self {
            HiringApiError::MissingActor => {
                let payload = json!({ "error": "missing x-actor-id header", "code": "missing_actor" });
                (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
            }
            HiringApiError::BadRequest(message) => {
                let payload = json!({ "error": message, "code": "bad_request" });
                (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
            }
            HiringApiError::Service(err) => err.into_response(),
        }
    }
}

impl IntoResponse for HiringServiceError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, payload) = match &self {
            HiringServiceError::Transition(err) => transition_payload(err, &message),
            HiringServiceError::Assessment(err) => {
                let (status, code) = match err {
                    AssessmentError::EmptyQuiz => (StatusCode::UNPROCESSABLE_ENTITY, "empty_quiz"),
                    AssessmentError::NotStarted => (StatusCode::CONFLICT, "assessment_not_started"),
                    AssessmentError::AlreadyStarted => {
                        (StatusCode::CONFLICT, "assessment_already_started")
                    }
                    AssessmentError::UnknownQuestion(_) => (StatusCode::BAD_REQUEST, "unknown_question"),
                    AssessmentError::AnswerMismatch { .. } => {
                        (StatusCode::BAD_REQUEST, "answer_mismatch")
                    }
                };
                (status, json!({ "error": message, "code": code }))
            }
            HiringServiceError::Repository(err) => {
                let (status, code) = match err {
                    RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                    RepositoryError::Conflict => (StatusCode::CONFLICT, "conflict"),
                    RepositoryError::Stale { .. } => (StatusCode::CONFLICT, "stale_write"),
                    RepositoryError::Unavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "repository_unavailable")
                    }
                };
                (status, json!({ "error": message, "code": code }))
            }
            HiringServiceError::Report(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message, "code": "report_failed" }),
            ),
            HiringServiceError::JobNotFound(_) | HiringServiceError::ApplicationNotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": message, "code": "not_found" }),
            ),
            HiringServiceError::UndecidedVerdict => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": message, "code": "undecided_verdict" }),
            ),
        };
        (status, axum::Json(payload)).into_response()
    }
}

fn transition_payload(err: &TransitionError, message: &str) -> (StatusCode, serde_json::Value) {
    match err {
        TransitionError::IllegalTransition { from, to } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "code": "illegal_transition", "from": from, "to": to }),
        ),
        TransitionError::Unauthorized { .. } => (
            StatusCode::FORBIDDEN,
            json!({ "error": message, "code": "unauthorized" }),
        ),
        TransitionError::IncompleteJob { field } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "code": "incomplete_job", "field": field }),
        ),
        TransitionError::AssessmentPending { kind } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "code": "assessment_pending", "kind": kind }),
        ),
        TransitionError::CandidateMismatch { .. } => (
            StatusCode::FORBIDDEN,
            json!({ "error": message, "code": "candidate_mismatch" }),
        ),
        TransitionError::StaleWrite { expected, found } => (
            StatusCode::CONFLICT,
            json!({
                "error": message,
                "code": "stale_write",
                "expected_version": expected,
                "current_version": found,
            }),
        ),
        TransitionError::JobNotPublished { status } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "code": "job_not_published", "status": status }),
        ),
        TransitionError::RecordLocked { status } => (
            StatusCode::CONFLICT,
            json!({ "error": message, "code": "record_locked", "status": status }),
        ),
    }
}
