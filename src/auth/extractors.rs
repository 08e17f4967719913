use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::{
    error::ApiError,
    profiles::repo_types::{Role, UserProfile},
    state::AppState,
};

/// The authenticated caller: identity, open session, and profile loaded for this request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub profile: UserProfile,
}

impl Session {
    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.profile.role != role {
            return Err(ApiError::Forbidden(format!("Only a {role} can do this")));
        }
        Ok(())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from(&state.config.jwt);

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;
        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("Access token required".into()));
        }

        let open = state
            .accounts
            .find_session(claims.sid)
            .await?
            .is_some_and(|s| s.is_open() && s.user_id == claims.sub);
        if !open {
            warn!(user_id = %claims.sub, session_id = %claims.sid, "session closed");
            return Err(ApiError::Unauthorized("Session has ended".into()));
        }

        let profile = state
            .profiles
            .find(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

        Ok(Session {
            user_id: claims.sub,
            session_id: claims.sid,
            profile,
        })
    }
}
