//! Test helpers shared by handler and service tests.

use axum::extract::FromRef;
use uuid::Uuid;

use crate::{
    auth::{extractors::Session, jwt::JwtKeys, repo_types::NewAccount, services::open_session},
    profiles::repo_types::{Role, UserProfile},
    state::AppState,
};

pub struct TestUser {
    pub profile: UserProfile,
    pub session_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestUser {
    pub fn session(&self) -> Session {
        Session {
            user_id: self.profile.id,
            session_id: self.session_id,
            profile: self.profile.clone(),
        }
    }
}

/// Creates an account with an open session, skipping password hashing.
pub async fn register(state: &AppState, full_name: &str, email: &str, role: Role) -> TestUser {
    let profile = state
        .accounts
        .create(NewAccount {
            email: email.into(),
            password_hash: "unused".into(),
            full_name: full_name.into(),
            role,
        })
        .await
        .expect("create account");

    let keys = JwtKeys::from_ref(state);
    let auth = open_session(state, &keys, profile).await.expect("open session");
    let claims = keys.verify(&auth.access_token).expect("fresh token verifies");

    TestUser {
        profile: auth.profile,
        session_id: claims.sid,
        access_token: auth.access_token,
        refresh_token: auth.refresh_token,
    }
}
