use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::UpdateProfileRequest,
    repo_types::{ProfileChanges, UserProfile},
};
use crate::{
    auth::{extractors::Session, services::validated_name},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(session), fields(user_id = %session.user_id))]
pub async fn get_profile(session: Session) -> Json<UserProfile> {
    Json(session.profile)
}

/// Blank strings clear the optional fields.
fn optional_field(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(state, session, payload), fields(user_id = %session.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let changes = ProfileChanges {
        full_name: validated_name(&payload.full_name)?,
        location: optional_field(payload.location),
        phone: optional_field(payload.phone),
        role: payload.role,
    };

    let profile = state
        .profiles
        .update(session.user_id, &changes, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    if profile.role != session.profile.role {
        info!(from = %session.profile.role, to = %profile.role, "role changed");
    }
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::repo_types::Role;
    use crate::testing::register;

    #[tokio::test]
    async fn update_writes_and_returns_stored_profile() {
        let state = AppState::fake();
        let user = register(&state, "Mohammed Khan", "khan@example.com", Role::Farmer).await;
        let session = user.session();

        let Json(updated) = update_profile(
            State(state.clone()),
            session,
            Json(UpdateProfileRequest {
                full_name: " Mohammed A. Khan ".into(),
                location: Some("Ratnagiri, Maharashtra".into()),
                phone: Some("   ".into()),
                role: Role::Buyer,
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.full_name, "Mohammed A. Khan");
        assert_eq!(updated.location.as_deref(), Some("Ratnagiri, Maharashtra"));
        assert_eq!(updated.phone, None);
        assert_eq!(updated.role, Role::Buyer);
        assert!(updated.updated_at.is_some());

        let stored = state.profiles.find(user.profile.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_rejects_short_name() {
        let state = AppState::fake();
        let user = register(&state, "Aman Patel", "aman@example.com", Role::Buyer).await;
        let err = update_profile(
            State(state.clone()),
            user.session(),
            Json(UpdateProfileRequest {
                full_name: "A".into(),
                location: None,
                phone: None,
                role: Role::Buyer,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn get_returns_session_profile() {
        let state = AppState::fake();
        let user = register(&state, "Aman Patel", "aman@example.com", Role::Buyer).await;
        let Json(profile) = get_profile(user.session()).await;
        assert_eq!(profile.email, "aman@example.com");
    }
}
