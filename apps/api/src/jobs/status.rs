use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::store::JobStore;
use crate::models::job::{EnhancementJob, JobStatus};

/// What a caller sees of their job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub status: JobStatus,
    pub enhanced_resume: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
}

impl From<EnhancementJob> for JobStatusView {
    fn from(job: EnhancementJob) -> Self {
        Self {
            status: job.status,
            enhanced_resume: job.enhanced_resume,
            error: job.error,
            created_at: job.created_at,
            completion_time: job.completed_at,
        }
    }
}

/// Loads a job for `caller_id`. Read-only.
///
/// Unknown ids (including ids that are not UUIDs) are `NotFound`; a job
/// owned by someone else is `PermissionDenied` whatever its state.
pub async fn load_owned_job(
    jobs: &dyn JobStore,
    caller_id: &str,
    queue_id: &str,
) -> Result<EnhancementJob, AppError> {
    let not_found = || AppError::NotFound("Resume enhancement process not found".to_string());

    let id = Uuid::parse_str(queue_id.trim()).map_err(|_| not_found())?;
    let job = jobs.get(id).await?.ok_or_else(not_found)?;

    if job.owner_id != caller_id {
        return Err(AppError::PermissionDenied(
            "Not authorized to check this resume enhancement status".to_string(),
        ));
    }
    Ok(job)
}

pub async fn check_status(
    jobs: &dyn JobStore,
    caller_id: &str,
    queue_id: &str,
) -> Result<JobStatusView, AppError> {
    load_owned_job(jobs, caller_id, queue_id)
        .await
        .map(JobStatusView::from)
}
