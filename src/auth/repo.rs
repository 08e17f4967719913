use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Account, EmailTaken, NewAccount, SessionRecord};
use crate::profiles::repo_types::{ProfileRow, UserProfile};

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Find an account by (already normalized) email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;

    /// Create credentials and profile together. Fails with [`EmailTaken`] on a duplicate email.
    async fn create(&self, new: NewAccount) -> anyhow::Result<UserProfile>;

    async fn open_session(&self, user_id: Uuid) -> anyhow::Result<SessionRecord>;
    async fn find_session(&self, session_id: Uuid) -> anyhow::Result<Option<SessionRecord>>;

    /// Marks the session revoked. Returns false if it was unknown or already closed.
    async fn revoke_session(&self, session_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool>;
}

/// Postgres `unique_violation`.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(Clone)]
pub struct PgAccountRepo {
    db: PgPool,
}

impl PgAccountRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepo for PgAccountRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let user = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(&self, new: NewAccount) -> anyhow::Result<UserProfile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, full_name, email, role, location, phone, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(new.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::Error::new(EmailTaken)
            } else {
                anyhow::Error::new(e).context("insert user")
            }
        })?;
        UserProfile::try_from(row)
    }

    async fn open_session(&self, user_id: Uuid) -> anyhow::Result<SessionRecord> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, revoked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("insert session")?;
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> anyhow::Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"SELECT id, user_id, created_at, revoked_at FROM sessions WHERE id = $1"#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await
        .context("select session")?;
        Ok(session)
    }

    async fn revoke_session(&self, session_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL"#,
        )
        .bind(session_id)
        .bind(at)
        .execute(&self.db)
        .await
        .context("revoke session")?;
        Ok(res.rows_affected() == 1)
    }
}
