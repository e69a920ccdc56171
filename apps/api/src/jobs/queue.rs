//! Worker trigger queue.
//!
//! Enqueue publishes the id of every created job; the worker consumes them.
//! Delivery is at-least-once, duplicates are dropped by the worker's
//! pending-state guard.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Redis list holding job ids waiting for the worker.
pub const QUEUE_KEY: &str = "resumate:enhancement_jobs";
/// How long one `next` call blocks waiting for an id.
const POP_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish(&self, job_id: Uuid) -> Result<()>;

    /// Waits for the next job id. `None` means nothing arrived in this poll window.
    async fn next(&self) -> Result<Option<Uuid>>;
}

/// FIFO queue on a Redis list: LPUSH to publish, BRPOP to consume.
pub struct RedisJobQueue {
    publisher: MultiplexedConnection,
    // BRPOP blocks its connection, so the consumer gets its own.
    consumer: Mutex<MultiplexedConnection>,
}

impl RedisJobQueue {
    pub async fn connect(client: &redis::Client) -> Result<Self> {
        let publisher = client.get_multiplexed_async_connection().await?;
        let consumer = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            publisher,
            consumer: Mutex::new(consumer),
        })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn publish(&self, job_id: Uuid) -> Result<()> {
        let mut con = self.publisher.clone();
        let depth: i64 = redis::cmd("LPUSH")
            .arg(QUEUE_KEY)
            .arg(job_id.to_string())
            .query_async(&mut con)
            .await?;
        debug!(%job_id, depth, "Published enhancement job");
        Ok(())
    }

    async fn next(&self) -> Result<Option<Uuid>> {
        let mut con = self.consumer.lock().await;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(QUEUE_KEY)
            .arg(POP_TIMEOUT.as_secs())
            .query_async(&mut *con)
            .await?;

        Ok(popped.and_then(|(_, raw)| parse_job_id(&raw)))
    }
}

fn parse_job_id(raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Dropping malformed job id '{raw}' from queue: {e}");
            None
        }
    }
}
