//! Persistence of enhancement jobs.
//!
//! Every state change is a conditional UPDATE on the current status, so a
//! job only ever moves forward and a terminal job is never touched again.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{EnhancementJob, EnhancementJobRow, JobStatus};

/// Carried in `AppState` and the worker as `Arc<dyn JobStore>`.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &EnhancementJob) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<EnhancementJob>>;

    /// Newest first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<EnhancementJob>>;

    async fn list_pending_ids(&self) -> Result<Vec<Uuid>>;

    /// `pending → processing`. Returns false if the job was not pending.
    async fn mark_processing(&self, id: Uuid) -> Result<bool>;

    /// `processing → completed`. Returns false if the job was not processing.
    async fn mark_completed(&self, id: Uuid, enhanced_resume: &str) -> Result<bool>;

    /// `{pending, processing} → error`. Returns false if the job was already terminal.
    async fn mark_error(&self, id: Uuid, message: &str) -> Result<bool>;

    /// Fails every job that entered `processing` before `started_before`.
    async fn fail_stale(&self, started_before: DateTime<Utc>, message: &str) -> Result<Vec<Uuid>>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &EnhancementJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resume_enhancement_jobs
                (id, user_id, file_url, file_name, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(&job.owner_id)
        .bind(&job.file_url)
        .bind(&job.file_name)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EnhancementJob>> {
        let row = sqlx::query_as::<_, EnhancementJobRow>(
            "SELECT * FROM resume_enhancement_jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EnhancementJob::try_from).transpose()
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<EnhancementJob>> {
        sqlx::query_as::<_, EnhancementJobRow>(
            "SELECT * FROM resume_enhancement_jobs WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(EnhancementJob::try_from)
        .collect()
    }

    async fn list_pending_ids(&self) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT id FROM resume_enhancement_jobs WHERE status = $1 ORDER BY created_at ASC",
        )
        .bind(JobStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE resume_enhancement_jobs
            SET status = $2, processing_started_at = NOW()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(JobStatus::Processing.as_str())
        .bind(JobStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(&self, id: Uuid, enhanced_resume: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE resume_enhancement_jobs
            SET status = $2, enhanced_resume = $3, completed_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(JobStatus::Completed.as_str())
        .bind(enhanced_resume)
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE resume_enhancement_jobs
            SET status = $2, error = $3, errored_at = NOW()
            WHERE id = $1 AND status IN ($4, $5)
            "#,
        )
        .bind(id)
        .bind(JobStatus::Error.as_str())
        .bind(message)
        .bind(JobStatus::Pending.as_str())
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>, message: &str) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            r#"
            UPDATE resume_enhancement_jobs
            SET status = $1, error = $2, errored_at = NOW()
            WHERE status = $3 AND processing_started_at < $4
            RETURNING id
            "#,
        )
        .bind(JobStatus::Error.as_str())
        .bind(message)
        .bind(JobStatus::Processing.as_str())
        .bind(started_before)
        .fetch_all(&self.pool)
        .await?)
    }
}
