use crate::infra::{ApiService, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use hiring_workflow::error::AppError;
use hiring_workflow::workflows::hiring::{hiring_router, Quiz, QuizImporter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct QuizImportRequest {
    pub(crate) csv: String,
    pub(crate) time_limit_minutes: u32,
    pub(crate) passing_score: u8,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizImportResponse {
    pub(crate) questions: usize,
    pub(crate) total_points: u32,
    pub(crate) quiz: Quiz,
}

pub(crate) fn with_hiring_routes(service: Arc<ApiService>) -> Router {
    hiring_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/quizzes/import", post(quiz_import_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Parses a CSV question bank so a project leader can review it before attaching it to a job.
pub(crate) async fn quiz_import_endpoint(
    Json(payload): Json<QuizImportRequest>,
) -> Result<Json<QuizImportResponse>, AppError> {
    let QuizImportRequest {
        csv,
        time_limit_minutes,
        passing_score,
    } = payload;

    let reader = Cursor::new(csv.into_bytes());
    let quiz = QuizImporter::from_reader(reader, time_limit_minutes, passing_score)?;

    Ok(Json(QuizImportResponse {
        questions: quiz.len(),
        total_points: quiz.total_points(),
        quiz,
    }))
}
