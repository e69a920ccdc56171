//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::jobs::enhancer::ResumeEnhancer;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;
use crate::llm_client::LlmError;
use crate::models::job::{EnhancementJob, JobStatus};
use crate::models::profile::{ProfileDetails, ProfileRow};
use crate::profiles::store::ProfileStore;
use crate::state::AppState;
use crate::storage::{ObjectStorage, StorageError};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_FILE_URL_BASE: &str = "https://files.test/resumes-bucket";

/// Job store enforcing the same transition guards as the SQL store.
/// Records every status it writes so tests can replay the history.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<Uuid, EnhancementJob>>,
    history: Mutex<Vec<(Uuid, JobStatus)>>,
    fail_completions: AtomicBool,
}

impl InMemoryJobStore {
    pub fn all(&self) -> Vec<EnhancementJob> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }

    pub fn history_of(&self, id: Uuid) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(job_id, _)| *job_id == id)
            .map(|(_, status)| *status)
            .collect()
    }

    /// Makes every later `mark_completed` return an error.
    pub fn fail_completions(&self) {
        self.fail_completions.store(true, Ordering::SeqCst);
    }

    /// Overwrites a stored job as-is, bypassing the guards.
    pub fn put(&self, job: EnhancementJob) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    fn transition(
        &self,
        id: Uuid,
        next: JobStatus,
        apply: impl FnOnce(&mut EnhancementJob),
    ) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return false;
        };
        if !job.status.can_transition_to(next) {
            return false;
        }
        job.status = next;
        apply(job);
        self.history.lock().unwrap().push((id, next));
        true
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &EnhancementJob) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        anyhow::ensure!(!jobs.contains_key(&job.id), "duplicate job id {}", job.id);
        jobs.insert(job.id, job.clone());
        self.history.lock().unwrap().push((job.id, job.status));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EnhancementJob>> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<EnhancementJob>> {
        let mut jobs: Vec<_> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn list_pending_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.id)
            .collect())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool> {
        Ok(self.transition(id, JobStatus::Processing, |job| {
            job.processing_started_at = Some(Utc::now());
        }))
    }

    async fn mark_completed(&self, id: Uuid, enhanced_resume: &str) -> Result<bool> {
        anyhow::ensure!(
            !self.fail_completions.load(Ordering::SeqCst),
            "job store unavailable"
        );
        Ok(self.transition(id, JobStatus::Completed, |job| {
            job.enhanced_resume = Some(enhanced_resume.to_string());
            job.completed_at = Some(Utc::now());
        }))
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<bool> {
        Ok(self.transition(id, JobStatus::Error, |job| {
            job.error = Some(message.to_string());
            job.errored_at = Some(Utc::now());
        }))
    }

    async fn fail_stale(&self, started_before: DateTime<Utc>, message: &str) -> Result<Vec<Uuid>> {
        let stale: Vec<Uuid> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| {
                j.status == JobStatus::Processing
                    && j.processing_started_at.is_some_and(|t| t < started_before)
            })
            .map(|j| j.id)
            .collect();

        Ok(stale
            .into_iter()
            .filter(|id| {
                self.transition(*id, JobStatus::Error, |job| {
                    job.error = Some(message.to_string());
                    job.errored_at = Some(Utc::now());
                })
            })
            .collect())
    }
}

/// Channel-backed queue that also remembers everything published.
pub struct ChannelJobQueue {
    tx: mpsc::UnboundedSender<Uuid>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Uuid>>,
    published: Mutex<Vec<Uuid>>,
    fail_publish: AtomicBool,
}

impl Default for ChannelJobQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            published: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
        }
    }
}

impl ChannelJobQueue {
    pub fn published(&self) -> Vec<Uuid> {
        self.published.lock().unwrap().clone()
    }

    pub fn fail_publishes(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobQueue for ChannelJobQueue {
    async fn publish(&self, job_id: Uuid) -> Result<()> {
        anyhow::ensure!(
            !self.fail_publish.load(Ordering::SeqCst),
            "queue unavailable"
        );
        self.published.lock().unwrap().push(job_id);
        self.tx.send(job_id)?;
        Ok(())
    }

    async fn next(&self) -> Result<Option<Uuid>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
            Ok(id) => Ok(id),
            Err(_) => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    content_types: Mutex<HashMap<String, String>>,
    fail_downloads: AtomicBool,
}

impl InMemoryStorage {
    pub fn with_object(key: &str, body: &[u8]) -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::copy_from_slice(body));
        storage
    }

    pub fn fail_downloads(&self) {
        self.fail_downloads.store(true, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        self.content_types
            .lock()
            .unwrap()
            .insert(key.to_string(), content_type.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<String, ProfileRow>>,
    fail_writes: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn profile(&self, user_id: &str) -> Option<ProfileRow> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn update(&self, user_id: &str, apply: impl FnOnce(&mut ProfileRow)) -> Result<ProfileRow> {
        anyhow::ensure!(
            !self.fail_writes.load(Ordering::SeqCst),
            "profile store unavailable"
        );
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| ProfileRow::empty(user_id));
        apply(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        Ok(self.profile(user_id))
    }

    async fn upsert_details(&self, user_id: &str, details: &ProfileDetails) -> Result<ProfileRow> {
        self.update(user_id, |p| {
            p.full_name = details.full_name.clone();
            p.username = details.username.clone();
            p.skills = details.skills.clone();
        })
    }

    async fn record_upload(&self, user_id: &str, resume_url: &str, file_name: &str) -> Result<()> {
        self.update(user_id, |p| {
            p.resume_url = Some(resume_url.to_string());
            p.resume_file_name = Some(file_name.to_string());
            p.resume_uploaded_at = Some(Utc::now());
        })
        .map(|_| ())
    }

    async fn record_enhanced_resume(&self, user_id: &str, enhanced_resume: &str) -> Result<()> {
        self.update(user_id, |p| {
            p.enhanced_resume = Some(enhanced_resume.to_string());
            p.enhanced_resume_at = Some(Utc::now());
        })
        .map(|_| ())
    }
}

/// Enhancer replaying a fixed script of outcomes, one per call.
/// `Err(msg)` becomes an HTTP 503 from the API. Calls past the script fail.
pub struct ScriptedEnhancer {
    script: Mutex<VecDeque<Result<String, String>>>,
    inputs: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedEnhancer {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            inputs: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeEnhancer for ScriptedEnhancer {
    async fn enhance(&self, resume_text: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(resume_text.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        redis_url: "redis://localhost".to_string(),
        s3_bucket: "resumes-bucket".to_string(),
        s3_endpoint: "https://files.test".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        file_url_base: TEST_FILE_URL_BASE.to_string(),
        stale_job_timeout: Duration::from_secs(900),
        stale_sweep_interval: Duration::from_secs(60),
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// Fakes behind an `AppState`, kept as concrete types for assertions.
pub struct TestHarness {
    pub jobs: Arc<InMemoryJobStore>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub storage: Arc<InMemoryStorage>,
    pub queue: Arc<ChannelJobQueue>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(InMemoryJobStore::default()),
            profiles: Arc::new(InMemoryProfileStore::default()),
            storage: Arc::new(InMemoryStorage::default()),
            queue: Arc::new(ChannelJobQueue::default()),
        }
    }

    pub fn state(&self) -> AppState {
        let config = test_config();
        AppState {
            jobs: self.jobs.clone(),
            profiles: self.profiles.clone(),
            storage: self.storage.clone(),
            queue: self.queue.clone(),
            auth: JwtVerifier::new(&config.jwt_secret),
            config,
        }
    }

    pub fn bearer(user_id: &str) -> String {
        format!(
            "Bearer {}",
            crate::auth::issue_test_token(TEST_JWT_SECRET, user_id, 3600)
        )
    }
}
