use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::{dto::AuthResponse, jwt::JwtKeys};
use crate::{error::ApiError, profiles::repo_types::UserProfile, state::AppState};

pub const MIN_NAME_LEN: usize = 2;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a display name and returns it trimmed.
pub(crate) fn validated_name(full_name: &str) -> Result<String, ApiError> {
    let name = full_name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Full name must be at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Signs an access/refresh pair bound to `session_id`.
pub(crate) fn issue_tokens(
    keys: &JwtKeys,
    profile: UserProfile,
    session_id: Uuid,
) -> Result<AuthResponse, ApiError> {
    let access_token = keys.sign_access(profile.id, session_id)?;
    let refresh_token = keys.sign_refresh(profile.id, session_id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        profile,
    })
}

/// Opens a new session for `profile` and returns its tokens.
pub(crate) async fn open_session(
    state: &AppState,
    keys: &JwtKeys,
    profile: UserProfile,
) -> Result<AuthResponse, ApiError> {
    let session = state.accounts.open_session(profile.id).await?;
    issue_tokens(keys, profile, session.id)
}
