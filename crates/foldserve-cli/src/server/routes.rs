use super::error::ApiError;
use super::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use foldserve::core::models::job::{Job, JobId, JobState};
use foldserve::engine::progress::ProgressReporter;
use foldserve::workflows::fold::Submission;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Deserialize, Debug)]
pub struct FoldRequest {
    pub sequence: String,
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct FoldResponse {
    pub job_id: JobId,
    pub status: &'static str,
}

/// The progress view of a job, without per-step results.
#[derive(Serialize, Debug)]
pub struct StatusResponse<'a> {
    pub job_id: &'a JobId,
    pub status: JobState,
    pub progress: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a Job> for StatusResponse<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            job_id: job.id(),
            status: job.state(),
            progress: job.progress(),
            total_steps: job.total_steps(),
            error: job.error(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_loaded: bool,
}

pub async fn submit_fold(
    State(state): State<AppState>,
    payload: Result<Json<FoldRequest>, JsonRejection>,
) -> Result<Json<FoldResponse>, ApiError> {
    let Json(request) = payload?;
    let submission = state
        .service
        .submit(&request.sequence, request.job_id.as_deref())?;

    let status = submission.status_label();
    if let Submission::Accepted(ticket) = &submission {
        let service = state.service.clone();
        let ticket = ticket.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = service.run_job(&ticket, &ProgressReporter::new()) {
                error!("Could not record outcome of job '{}': {}", ticket.job_id, e);
            }
        });
    }

    Ok(Json(FoldResponse {
        job_id: submission.job_id().clone(),
        status,
    }))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = lookup(state, job_id).await?;
    to_json(&StatusResponse::from(&job))
}

pub async fn job_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = lookup(state, job_id).await?;
    info!("Serving results for job '{}' ({}).", job.id(), job.state());
    Ok(Json(job))
}

/// Store reads touch the disk and wait on the store lock, so they run on the blocking pool.
async fn lookup(state: AppState, job_id: String) -> Result<Job, ApiError> {
    let job = tokio::task::spawn_blocking(move || state.service.status(&job_id))
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("status lookup failed: {}", e),
            )
        })??;
    Ok(job)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.service.model();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: model.model_name().to_string(),
        model_loaded: model.is_loaded(),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Json<serde_json::Value>, ApiError> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
