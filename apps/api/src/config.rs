use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_STALE_JOB_TIMEOUT_SECS: u64 = 900;
const DEFAULT_STALE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub jwt_secret: String,
    /// Prefix of the file references handed back by the upload endpoint.
    pub file_url_base: String,
    /// Jobs stuck in `processing` longer than this are failed by the reaper.
    pub stale_job_timeout: Duration,
    pub stale_sweep_interval: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_bucket = require_env("S3_BUCKET")?;
        let s3_endpoint = require_env("S3_ENDPOINT")?;
        let file_url_base = std::env::var("FILE_URL_BASE").unwrap_or_else(|_| {
            format!("{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket)
        });

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket,
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            file_url_base,
            stale_job_timeout: Duration::from_secs(optional_secs(
                "STALE_JOB_TIMEOUT_SECS",
                DEFAULT_STALE_JOB_TIMEOUT_SECS,
            )?),
            stale_sweep_interval: Duration::from_secs(optional_secs(
                "STALE_SWEEP_INTERVAL_SECS",
                DEFAULT_STALE_SWEEP_INTERVAL_SECS,
            )?),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds")),
        Err(_) => Ok(default),
    }
}
