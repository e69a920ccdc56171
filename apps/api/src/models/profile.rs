use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRow {
    pub user_id: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    pub resume_file_name: Option<String>,
    pub resume_uploaded_at: Option<DateTime<Utc>>,
    /// Copy of the last completed enhancement, for direct display.
    pub enhanced_resume: Option<String>,
    pub enhanced_resume_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn empty(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            full_name: None,
            username: None,
            skills: Vec::new(),
            resume_url: None,
            resume_file_name: None,
            resume_uploaded_at: None,
            enhanced_resume: None,
            enhanced_resume_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDetails {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub skills: Vec<String>,
}
