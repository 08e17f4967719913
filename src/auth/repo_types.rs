use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::repo_types::Role;

/// Credential columns of the `users` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,                   // unique user ID
    pub email: String,              // lowercased email
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // creation timestamp
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// Server-side session opened at sign-in, closed at sign-out.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

impl SessionRecord {
    pub fn is_open(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// [`AccountRepo::create`](super::repo::AccountRepo::create) found the email already in use.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct EmailTaken;
