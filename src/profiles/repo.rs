use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ProfileChanges, ProfileRow, UserProfile};

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;

    /// Writes the changes and returns the stored profile, `None` if the user is gone.
    async fn update(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<UserProfile>>;
}

#[derive(Clone)]
pub struct PgProfileRepo {
    db: PgPool,
}

impl PgProfileRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn find(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, full_name, email, role, location, phone, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("select profile")?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn update(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            UPDATE users
               SET full_name = $2, location = $3, phone = $4, role = $5, updated_at = $6
             WHERE id = $1
            RETURNING id, full_name, email, role, location, phone, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&changes.full_name)
        .bind(&changes.location)
        .bind(&changes.phone)
        .bind(changes.role.as_str())
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("update profile")?;
        row.map(UserProfile::try_from).transpose()
    }
}
