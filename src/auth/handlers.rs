use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, RefreshRequest, SignInRequest, SignUpRequest},
        extractors::Session,
        jwt::JwtKeys,
        password::{check_new_password, hash_password, verify_password},
        repo_types::{EmailTaken, NewAccount},
        services::{
            is_valid_email, issue_tokens, normalize_email, open_session, validated_name,
        },
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh))
        .route("/auth/sign-out", post(sign_out))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    check_new_password(&payload.password).inspect_err(|_| warn!("password too short"))?;
    let full_name = validated_name(&payload.full_name)?;

    if state.accounts.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::Internal(e)
    })?;

    let profile = state
        .accounts
        .create(NewAccount {
            email,
            password_hash,
            full_name,
            role: payload.role,
        })
        .await
        .map_err(|e| {
            if e.is::<EmailTaken>() {
                warn!("email registered concurrently");
                ApiError::Conflict("Email already registered".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    let keys = JwtKeys::from_ref(&state);
    let res = open_session(&state, &keys, profile).await?;
    info!(user_id = %res.profile.id, role = %res.profile.role, "user signed up");
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    let account = match state.accounts.find_by_email(&email).await? {
        Some(a) => a,
        None => {
            warn!(email = %email, "sign-in unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let ok = match verify_password(&payload.password, &account.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %account.id, "verify_password failed");
            false
        }
    };
    if !ok {
        warn!(user_id = %account.id, "sign-in invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let profile = state
        .profiles
        .find(account.id)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let keys = JwtKeys::from_ref(&state);
    let res = open_session(&state, &keys, profile).await?;
    info!(user_id = %res.profile.id, "user signed in");
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let open = state
        .accounts
        .find_session(claims.sid)
        .await?
        .is_some_and(|s| s.is_open() && s.user_id == claims.sub);
    if !open {
        warn!(user_id = %claims.sub, session_id = %claims.sid, "refresh on closed session");
        return Err(ApiError::Unauthorized("Session has ended".into()));
    }

    let profile = state
        .profiles
        .find(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, profile, claims.sid)?))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn sign_out(State(state): State<AppState>, session: Session) -> ApiResult<StatusCode> {
    state
        .accounts
        .revoke_session(session.session_id, OffsetDateTime::now_utc())
        .await?;
    info!(session_id = %session.session_id, "user signed out");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::AccountRepo;
    use crate::auth::repo_types::{Account, SessionRecord};
    use crate::memory::MemoryStore;
    use crate::profiles::repo_types::{Role, UserProfile};
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    fn sign_up_body(email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            full_name: "Rajesh Kumar".into(),
            email: email.into(),
            password: password.into(),
            role: Role::Farmer,
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let state = AppState::fake();
        let (status, Json(created)) = sign_up(
            State(state.clone()),
            Json(sign_up_body(" Rajesh@Example.com ", "secret-pass")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.profile.email, "rajesh@example.com");
        assert_eq!(created.profile.role, Role::Farmer);

        let Json(signed_in) = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "rajesh@example.com".into(),
                password: "secret-pass".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(signed_in.profile.id, created.profile.id);
        assert!(!signed_in.access_token.is_empty());
    }

    #[tokio::test]
    async fn sign_up_validates_input() {
        let state = AppState::fake();
        let err = sign_up(State(state.clone()), Json(sign_up_body("nope", "secret-pass")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = sign_up(State(state.clone()), Json(sign_up_body("a@b.co", "12345")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = AppState::fake();
        sign_up(State(state.clone()), Json(sign_up_body("dup@example.com", "secret-pass")))
            .await
            .unwrap();
        let err = sign_up(State(state.clone()), Json(sign_up_body("DUP@example.com", "other-pass")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    /// Misses every existing account on lookup, as a sign-up racing another one would.
    struct StaleLookup(MemoryStore);

    #[async_trait]
    impl AccountRepo for StaleLookup {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<Account>> {
            Ok(None)
        }
        async fn create(&self, new: NewAccount) -> anyhow::Result<UserProfile> {
            self.0.create(new).await
        }
        async fn open_session(&self, user_id: Uuid) -> anyhow::Result<SessionRecord> {
            self.0.open_session(user_id).await
        }
        async fn find_session(&self, session_id: Uuid) -> anyhow::Result<Option<SessionRecord>> {
            self.0.find_session(session_id).await
        }
        async fn revoke_session(&self, session_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
            self.0.revoke_session(session_id, at).await
        }
    }

    #[tokio::test]
    async fn losing_a_sign_up_race_is_a_conflict() {
        let mut state = AppState::fake();
        state.accounts = Arc::new(StaleLookup(MemoryStore::default()));

        sign_up(State(state.clone()), Json(sign_up_body("race@example.com", "secret-pass")))
            .await
            .unwrap();
        let err = sign_up(State(state.clone()), Json(sign_up_body("race@example.com", "secret-pass")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let state = AppState::fake();
        sign_up(State(state.clone()), Json(sign_up_body("known@example.com", "secret-pass")))
            .await
            .unwrap();

        let wrong = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "known@example.com".into(),
                password: "bad-pass".into(),
            }),
        )
        .await
        .unwrap_err();
        let unknown = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "ghost@example.com".into(),
                password: "secret-pass".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(wrong.to_string(), "Invalid credentials");
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_stops_working_after_sign_out() {
        let state = AppState::fake();
        let (_, Json(created)) =
            sign_up(State(state.clone()), Json(sign_up_body("out@example.com", "secret-pass")))
                .await
                .unwrap();

        let Json(rotated) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: created.refresh_token.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(rotated.profile.id, created.profile.id);

        let claims = JwtKeys::from_ref(&state).verify(&created.access_token).unwrap();
        let session = Session {
            user_id: created.profile.id,
            session_id: claims.sid,
            profile: created.profile.clone(),
        };
        let status = sign_out(State(state.clone()), session).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: created.refresh_token,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Session has ended");
    }
}
