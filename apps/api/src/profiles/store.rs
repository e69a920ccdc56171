use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::profile::{ProfileDetails, ProfileRow};

/// User profile documents. Writes upsert so a missing profile is created.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<ProfileRow>>;

    async fn upsert_details(&self, user_id: &str, details: &ProfileDetails) -> Result<ProfileRow>;

    async fn record_upload(&self, user_id: &str, resume_url: &str, file_name: &str) -> Result<()>;

    /// Denormalized copy of the latest completed enhancement.
    async fn record_enhanced_resume(&self, user_id: &str, enhanced_resume: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        Ok(
            sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn upsert_details(&self, user_id: &str, details: &ProfileDetails) -> Result<ProfileRow> {
        Ok(sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (user_id, full_name, username, skills)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                username = EXCLUDED.username,
                skills = EXCLUDED.skills,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&details.full_name)
        .bind(&details.username)
        .bind(&details.skills)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn record_upload(&self, user_id: &str, resume_url: &str, file_name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, resume_url, resume_file_name, resume_uploaded_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET resume_url = EXCLUDED.resume_url,
                resume_file_name = EXCLUDED.resume_file_name,
                resume_uploaded_at = EXCLUDED.resume_uploaded_at,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(resume_url)
        .bind(file_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_enhanced_resume(&self, user_id: &str, enhanced_resume: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, enhanced_resume, enhanced_resume_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET enhanced_resume = EXCLUDED.enhanced_resume,
                enhanced_resume_at = EXCLUDED.enhanced_resume_at,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(enhanced_resume)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
