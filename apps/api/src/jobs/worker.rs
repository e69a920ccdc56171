//! Enhancement worker: the consumer side of the trigger queue.
//!
//! Flow per delivery: load job → pending guard → mark processing →
//! resolve file reference → download → extract text → enhance (with retry)
//! → remove temp file → mark completed → copy result onto the profile.
//! Any failure after the guard marks the job `error` with the message.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::jobs::enhancer::ResumeEnhancer;
use crate::jobs::extract::extract_resume_text;
use crate::jobs::file_ref::parse_file_reference;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;
use crate::llm_client::LlmError;
use crate::models::job::{EnhancementJob, JobStatus};
use crate::profiles::store::ProfileStore;
use crate::retry::RetryPolicy;
use crate::storage::ObjectStorage;

/// Pause after a failed queue read before polling again.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// Failures that end a job in `error`. The display text is what the client sees.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Also covers a failed download: the client only learns the file could not be fetched.
    #[error("Invalid file URL format")]
    InvalidFileReference,

    #[error("Failed to stage resume locally: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Resume enhancement failed: {0}")]
    Enhancement(#[from] LlmError),
}

/// What one trigger delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Unknown job, not pending, or overtaken by another writer.
    Ignored,
    Completed,
    Failed,
}

pub struct EnhancementWorker {
    jobs: Arc<dyn JobStore>,
    profiles: Arc<dyn ProfileStore>,
    storage: Arc<dyn ObjectStorage>,
    enhancer: Arc<dyn ResumeEnhancer>,
    retry: RetryPolicy,
    scratch_dir: PathBuf,
}

impl EnhancementWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        profiles: Arc<dyn ProfileStore>,
        storage: Arc<dyn ObjectStorage>,
        enhancer: Arc<dyn ResumeEnhancer>,
    ) -> Self {
        Self {
            jobs,
            profiles,
            storage,
            enhancer,
            retry: RetryPolicy::enhancement(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Directory for temporary copies of downloaded resumes.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Consumes the trigger queue until `cancel` fires. Each delivery runs on its own task.
    pub async fn run(self: Arc<Self>, queue: Arc<dyn JobQueue>, cancel: CancellationToken) {
        info!("Enhancement worker started");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Enhancement worker shutting down");
                    break;
                }
                next = queue.next() => next,
            };

            match next {
                Ok(Some(job_id)) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = worker.handle(job_id).await {
                            error!(%job_id, "Enhancement delivery failed: {e:?}");
                        }
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Failed to read enhancement queue: {e:?}");
                    tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Republishes every job still `pending`, e.g. ones enqueued while no worker was running.
    pub async fn requeue_pending(&self, queue: &dyn JobQueue) -> Result<usize> {
        let pending = self.jobs.list_pending_ids().await?;
        for job_id in &pending {
            queue.publish(*job_id).await?;
        }
        if !pending.is_empty() {
            info!(count = pending.len(), "Requeued pending enhancement jobs");
        }
        Ok(pending.len())
    }

    /// Handles one trigger delivery for `job_id`.
    pub async fn handle(&self, job_id: Uuid) -> Result<Delivery> {
        let Some(job) = self.jobs.get(job_id).await? else {
            warn!(%job_id, "Trigger for unknown enhancement job");
            return Ok(Delivery::Ignored);
        };

        // Duplicate deliveries land here.
        if job.status != JobStatus::Pending {
            debug!(%job_id, status = %job.status, "Skipping job that is not pending");
            return Ok(Delivery::Ignored);
        }
        if !self.jobs.mark_processing(job_id).await? {
            debug!(%job_id, "Job was claimed by another delivery");
            return Ok(Delivery::Ignored);
        }

        info!(%job_id, user_id = %job.owner_id, "Processing resume enhancement");

        match self.process(&job).await {
            Ok(enhanced) => {
                match self.jobs.mark_completed(job_id, &enhanced).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(%job_id, "Job left processing before its result was recorded");
                        return Ok(Delivery::Ignored);
                    }
                    Err(e) => {
                        error!(%job_id, "Failed to record enhancement result: {e:?}");
                        self.jobs.mark_error(job_id, &e.to_string()).await?;
                        return Ok(Delivery::Failed);
                    }
                }
                if let Err(e) = self
                    .profiles
                    .record_enhanced_resume(&job.owner_id, &enhanced)
                    .await
                {
                    error!(%job_id, user_id = %job.owner_id, "Failed to copy result to profile: {e:?}");
                }
                info!(%job_id, "Resume enhancement completed");
                Ok(Delivery::Completed)
            }
            Err(e) => {
                error!(%job_id, "Error processing resume: {e}");
                self.jobs.mark_error(job_id, &e.to_string()).await?;
                Ok(Delivery::Failed)
            }
        }
    }

    async fn process(&self, job: &EnhancementJob) -> Result<String, WorkerError> {
        let key = parse_file_reference(&job.file_url).ok_or(WorkerError::InvalidFileReference)?;

        let body = self.storage.download(&key).await.map_err(|e| {
            error!(job_id = %job.id, key = %key, "Failed to download resume: {e}");
            WorkerError::InvalidFileReference
        })?;
        let staged = stage_file(&self.scratch_dir, &job.file_name, &body)?;

        let resume_text =
            extract_resume_text(staged.path().to_path_buf(), &job.file_name, &job.file_url).await;

        let enhancer = self.enhancer.as_ref();
        let text = resume_text.as_str();
        let enhanced = self
            .retry
            .run("Resume enhancement", move |attempt| {
                debug!(job_id = %job.id, attempt, "Calling enhancement service");
                enhancer.enhance(text)
            })
            .await?;

        if let Err(e) = staged.close() {
            warn!(job_id = %job.id, "Failed to remove temporary resume copy: {e}");
        }

        Ok(enhanced)
    }
}

/// Writes the downloaded bytes to a temp file that keeps the original extension.
fn stage_file(dir: &Path, file_name: &str, body: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = file_name
        .rsplit_once('.')
        .filter(|(_, ext)| !ext.is_empty() && ext.len() <= 8)
        .filter(|(_, ext)| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|(_, ext)| format!(".{ext}"))
        .unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(body)?;
    file.flush()?;
    Ok(file)
}
