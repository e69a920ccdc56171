use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;
use crate::profiles::store::ProfileStore;
use crate::storage::ObjectStorage;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every backend is constructed once in `main` and passed in here; handlers
/// never reach for a global client.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub storage: Arc<dyn ObjectStorage>,
    /// Trigger queue consumed by the enhancement worker.
    pub queue: Arc<dyn JobQueue>,
    pub auth: JwtVerifier,
    pub config: Config,
}
