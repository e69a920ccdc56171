//! Client-side poller for an enhancement job.
//!
//! Checks the status endpoint on a fixed interval until the job reaches a
//! terminal state or the caller cancels. No backoff and no attempt cap.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::job::JobStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status check failed ({code}): {message}")]
    Api { code: String, message: String },
}

/// The fields of a status response the poller acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: JobStatus,
    pub enhanced_resume: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(String),
    Failed(String),
    Cancelled,
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn check(&self, queue_id: &str) -> Result<StatusSnapshot, PollError>;
}

/// Polls `source` every `interval`, first check one interval after the call.
///
/// Stops on `error`, or on `completed` once the enhanced text is present.
/// A failed status request ends polling with the error.
pub async fn poll_until_terminal(
    source: &dyn StatusSource,
    queue_id: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError> {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
            _ = ticker.tick() => {}
        }

        let snapshot = source.check(queue_id).await?;
        debug!(queue_id, status = %snapshot.status, "Polled enhancement status");

        match snapshot.status {
            // A completed job without its text yet is polled again.
            JobStatus::Completed => {
                if let Some(text) = snapshot.enhanced_resume {
                    return Ok(PollOutcome::Completed(text));
                }
            }
            JobStatus::Error => {
                return Ok(PollOutcome::Failed(
                    snapshot
                        .error
                        .unwrap_or_else(|| "Resume enhancement failed".to_string()),
                ))
            }
            JobStatus::Pending | JobStatus::Processing => {}
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// `StatusSource` over the HTTP status endpoint.
#[derive(Clone)]
pub struct HttpStatusClient {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl HttpStatusClient {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
        }
    }

    fn status_url(&self) -> String {
        format!(
            "{}/api/v1/check-resume-status",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl StatusSource for HttpStatusClient {
    async fn check(&self, queue_id: &str) -> Result<StatusSnapshot, PollError> {
        let response = self
            .client
            .post(self.status_url())
            .bearer_auth(&self.bearer_token)
            .json(&serde_json::json!({ "queueId": queue_id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => PollError::Api {
                    code: envelope.error.code,
                    message: envelope.error.message,
                },
                Err(_) => PollError::Api {
                    code: status.as_u16().to_string(),
                    message: body,
                },
            });
        }

        Ok(response.json().await?)
    }
}
