//! Fails jobs that have sat in `processing` for too long.
//!
//! A worker that dies mid-job leaves its job in `processing`; without this
//! sweep the client would poll forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jobs::store::JobStore;

pub const STALE_JOB_MESSAGE: &str = "Processing timed out";

pub struct StaleJobReaper {
    jobs: Arc<dyn JobStore>,
    timeout: Duration,
    sweep_interval: Duration,
}

impl StaleJobReaper {
    pub fn new(jobs: Arc<dyn JobStore>, timeout: Duration, sweep_interval: Duration) -> Self {
        Self {
            jobs,
            timeout,
            sweep_interval,
        }
    }

    /// One pass: fail every job that started processing more than `timeout` ago.
    pub async fn sweep(&self) -> Result<Vec<Uuid>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.timeout)?;
        let reaped = self.jobs.fail_stale(cutoff, STALE_JOB_MESSAGE).await?;
        for job_id in &reaped {
            warn!(%job_id, "Failed enhancement job stuck in processing");
        }
        Ok(reaped)
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        info!(
            timeout_secs = self.timeout.as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Stale job reaper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stale job reaper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!("Stale job sweep failed: {e:?}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{EnhancementJob, JobStatus};
    use crate::testing::InMemoryJobStore;

    fn job_in(status: JobStatus, started_mins_ago: Option<i64>) -> EnhancementJob {
        let mut job =
            EnhancementJob::new_pending("u1".into(), "https://f/o/k?x".into(), "r.pdf".into());
        job.status = status;
        job.processing_started_at =
            started_mins_ago.map(|m| Utc::now() - chrono::Duration::minutes(m));
        job
    }

    #[tokio::test]
    async fn test_sweep_fails_only_stale_processing_jobs() {
        let store = Arc::new(InMemoryJobStore::default());
        let stale = job_in(JobStatus::Processing, Some(30));
        let fresh = job_in(JobStatus::Processing, Some(1));
        let pending = job_in(JobStatus::Pending, None);
        let mut done = job_in(JobStatus::Completed, Some(60));
        done.enhanced_resume = Some("Enhanced".into());
        for job in [&stale, &fresh, &pending, &done] {
            store.put(job.clone());
        }

        let reaper = StaleJobReaper::new(
            store.clone(),
            Duration::from_secs(15 * 60),
            Duration::from_secs(60),
        );
        let reaped = reaper.sweep().await.unwrap();

        assert_eq!(reaped, vec![stale.id]);
        let stale_now = store.get(stale.id).await.unwrap().unwrap();
        assert_eq!(stale_now.status, JobStatus::Error);
        assert_eq!(stale_now.error.as_deref(), Some(STALE_JOB_MESSAGE));
        assert_eq!(
            store.get(fresh.id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
        assert_eq!(
            store.get(done.id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
        assert_eq!(
            store.get(pending.id).await.unwrap().unwrap().status,
            JobStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let store = Arc::new(InMemoryJobStore::default());
        let reaper = StaleJobReaper::new(store, Duration::from_secs(60), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        cancel.cancel();
        reaper.run(cancel).await;
    }
}
