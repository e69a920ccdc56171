//! Axum route handlers for profiles and resume upload.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::file_ref::build_file_reference;
use crate::models::profile::{ProfileDetails, ProfileRow};
use crate::state::AppState;

/// Largest accepted resume upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    /// "rust, sql, aws"
    Csv(String),
    List(Vec<String>),
}

impl SkillsInput {
    pub fn into_skills(self) -> Vec<String> {
        let raw = match self {
            SkillsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
            SkillsInput::List(list) => list,
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub skills: Option<SkillsInput>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_url: String,
    pub file_name: String,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = state
        .profiles
        .get(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let details = ProfileDetails {
        full_name: non_blank(req.full_name),
        username: non_blank(req.username),
        skills: req.skills.map(SkillsInput::into_skills).unwrap_or_default(),
    };
    let profile = state.profiles.upsert_details(&user.user_id, &details).await?;
    Ok(Json(profile))
}

/// POST /api/v1/resumes/upload
///
/// Multipart field `file`, PDF only, at most 5 MiB. Returns the file
/// reference to pass to `/api/v1/enhance-resume`.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {e}")))?;
        upload = Some((file_name, content_type, body));
        break;
    }

    let (file_name, content_type, body) =
        upload.ok_or_else(|| AppError::InvalidArgument("Please select a file first".to_string()))?;

    if content_type.as_deref() != Some(PDF_CONTENT_TYPE) {
        return Err(AppError::InvalidArgument(
            "Please upload a PDF file".to_string(),
        ));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::InvalidArgument(
            "File size should be less than 5MB".to_string(),
        ));
    }

    let key = object_key(&user.user_id, &file_name);
    state
        .storage
        .upload(&key, body, PDF_CONTENT_TYPE)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    let file_url = build_file_reference(&state.config.file_url_base, &key);
    state
        .profiles
        .record_upload(&user.user_id, &file_url, &file_name)
        .await?;

    info!(user_id = %user.user_id, key = %key, "Stored uploaded resume");

    Ok(Json(UploadResponse {
        file_url,
        file_name,
    }))
}

/// `resumes/<user>/<uuid>.<ext>`; the extension comes from the client's file name.
fn object_key(user_id: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string());
    format!("resumes/{}/{}.{}", user_id, Uuid::new_v4(), ext)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
