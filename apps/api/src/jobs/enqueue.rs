use anyhow::Result;
use tracing::{info, warn};

use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;
use crate::models::job::EnhancementJob;

/// Creates one `pending` job for `owner_id` and fires the worker trigger.
///
/// The file reference is not checked here; the worker resolves it. If the
/// trigger cannot be published the job stays `pending` and is picked up
/// again when the worker restarts.
pub async fn enqueue_job(
    jobs: &dyn JobStore,
    queue: &dyn JobQueue,
    owner_id: &str,
    file_url: &str,
    file_name: &str,
) -> Result<EnhancementJob> {
    let job = EnhancementJob::new_pending(
        owner_id.to_string(),
        file_url.to_string(),
        file_name.to_string(),
    );
    jobs.insert(&job).await?;

    info!(job_id = %job.id, user_id = %owner_id, "Queued resume enhancement");

    if let Err(e) = queue.publish(job.id).await {
        warn!(job_id = %job.id, "Failed to publish enhancement trigger: {e:?}");
    }

    Ok(job)
}
