pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = profiles::MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume enhancement pipeline
        .route("/api/v1/enhance-resume", post(jobs::handle_enhance_resume))
        .route(
            "/api/v1/check-resume-status",
            post(jobs::handle_check_status),
        )
        .route(
            "/api/v1/resume-enhancements",
            get(jobs::handle_list_enhancements),
        )
        .route(
            "/api/v1/resume-enhancements/:id",
            get(jobs::handle_get_enhancement),
        )
        // Profile + upload
        .route(
            "/api/v1/profile",
            get(profiles::handle_get_profile).put(profiles::handle_update_profile),
        )
        .route(
            "/api/v1/resumes/upload",
            post(profiles::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .with_state(state)
}
