use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a resume enhancement job.
///
/// `Pending → Processing → {Completed, Error}`. A pending job may also be
/// failed directly. Terminal states never move again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Forward-only transition table.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Error)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(anyhow::anyhow!("unknown job status '{other}'")),
        }
    }
}

/// Raw row of `resume_enhancement_jobs`.
#[derive(Debug, Clone, FromRow)]
pub struct EnhancementJobRow {
    pub id: Uuid,
    pub user_id: String,
    pub file_url: String,
    pub file_name: String,
    pub status: String,
    pub enhanced_resume: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errored_at: Option<DateTime<Utc>>,
}

/// One submitted enhancement request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementJob {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub file_url: String,
    pub file_name: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_resume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "processingStartTime", skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(rename = "completionTime", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "errorTime", skip_serializing_if = "Option::is_none")]
    pub errored_at: Option<DateTime<Utc>>,
}

impl EnhancementJob {
    /// A fresh `pending` job with no outcome fields.
    pub fn new_pending(owner_id: String, file_url: String, file_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            file_url,
            file_name,
            status: JobStatus::Pending,
            enhanced_resume: None,
            error: None,
            created_at: Utc::now(),
            processing_started_at: None,
            completed_at: None,
            errored_at: None,
        }
    }
}

impl TryFrom<EnhancementJobRow> for EnhancementJob {
    type Error = anyhow::Error;

    fn try_from(row: EnhancementJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.user_id,
            file_url: row.file_url,
            file_name: row.file_name,
            status: row.status.parse()?,
            enhanced_resume: row.enhanced_resume,
            error: row.error,
            created_at: row.created_at,
            processing_started_at: row.processing_started_at,
            completed_at: row.completed_at,
            errored_at: row.errored_at,
        })
    }
}
