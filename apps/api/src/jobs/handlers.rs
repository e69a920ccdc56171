//! Axum route handlers for the resume enhancement pipeline.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::enqueue::enqueue_job;
use crate::jobs::status::{check_status, load_owned_job, JobStatusView};
use crate::models::job::EnhancementJob;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResumeRequest {
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResumeResponse {
    pub success: bool,
    pub queue_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    pub queue_id: String,
}

/// POST /api/v1/enhance-resume
pub async fn handle_enhance_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<EnhanceResumeRequest>,
) -> Result<Json<EnhanceResumeResponse>, AppError> {
    let job = enqueue_job(
        state.jobs.as_ref(),
        state.queue.as_ref(),
        &user.user_id,
        &req.file_url,
        &req.file_name,
    )
    .await
    .map_err(|e| AppError::Internal(e.context("Failed to start resume enhancement")))?;

    Ok(Json(EnhanceResumeResponse {
        success: true,
        queue_id: job.id,
        message: "Resume enhancement process started".to_string(),
    }))
}

/// POST /api/v1/check-resume-status
pub async fn handle_check_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CheckStatusRequest>,
) -> Result<Json<JobStatusView>, AppError> {
    let view = check_status(state.jobs.as_ref(), &user.user_id, &req.queue_id).await?;
    Ok(Json(view))
}

/// GET /api/v1/resume-enhancements/:id
pub async fn handle_get_enhancement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<EnhancementJob>, AppError> {
    let job = load_owned_job(state.jobs.as_ref(), &user.user_id, &id).await?;
    Ok(Json(job))
}

/// GET /api/v1/resume-enhancements
pub async fn handle_list_enhancements(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<EnhancementJob>>, AppError> {
    let jobs = state.jobs.list_for_owner(&user.user_id).await?;
    Ok(Json(jobs))
}
