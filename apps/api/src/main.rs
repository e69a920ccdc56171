use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resumate_api::auth::JwtVerifier;
use resumate_api::config::Config;
use resumate_api::db::create_pool;
use resumate_api::jobs::enhancer::LlmResumeEnhancer;
use resumate_api::jobs::queue::{JobQueue, RedisJobQueue};
use resumate_api::jobs::reaper::StaleJobReaper;
use resumate_api::jobs::store::{JobStore, PgJobStore};
use resumate_api::jobs::worker::EnhancementWorker;
use resumate_api::llm_client::{self, LlmClient};
use resumate_api::profiles::store::{PgProfileStore, ProfileStore};
use resumate_api::routes::build_router;
use resumate_api::state::AppState;
use resumate_api::storage::{ObjectStorage, S3Storage};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumate API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db.clone()));
    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(db));

    // Redis trigger queue, shared by the handlers (publish) and the worker (consume)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue: Arc<dyn JobQueue> = Arc::new(RedisJobQueue::connect(&redis).await?);
    info!("Redis queue connected");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let cancel = CancellationToken::new();

    let worker = Arc::new(EnhancementWorker::new(
        jobs.clone(),
        profiles.clone(),
        storage.clone(),
        Arc::new(LlmResumeEnhancer(llm)),
    ));
    if let Err(e) = worker.requeue_pending(queue.as_ref()).await {
        error!("Failed to requeue pending jobs: {e:?}");
    }
    let worker_handle = tokio::spawn(worker.run(queue.clone(), cancel.clone()));

    let reaper = StaleJobReaper::new(
        jobs.clone(),
        config.stale_job_timeout,
        config.stale_sweep_interval,
    );
    let reaper_cancel = cancel.clone();
    let reaper_handle = tokio::spawn(async move { reaper.run(reaper_cancel).await });

    let state = AppState {
        jobs,
        profiles,
        storage,
        queue,
        auth: JwtVerifier::new(&config.jwt_secret),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    let _ = tokio::join!(worker_handle, reaper_handle);
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    cancel.cancel();
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resumate-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not virtual host
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
