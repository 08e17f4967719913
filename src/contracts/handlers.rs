use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ActionRequest, ContractView, DashboardResponse},
    lifecycle::ContractAction,
    services,
};
use crate::{auth::extractors::Session, error::ApiResult, state::AppState};

pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/contracts/:id", get(get_contract))
        .route("/contracts/:id/:action", post(act_on_contract))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id, role = %session.role()))]
pub async fn dashboard(State(state): State<AppState>, session: Session) -> ApiResult<Json<DashboardResponse>> {
    let board = services::dashboard(&state, &session).await?;
    Ok(Json(board))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_contract(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ContractView>> {
    let contract = services::load_for_party(&state, &session, id).await?;
    Ok(Json(ContractView::for_role(contract, session.role())))
}

/// POST /contracts/:id/{accept|decline|deliver|pay|cancel}, body `{ "expected_version": n }` optional
#[instrument(skip(state, session, body), fields(user_id = %session.user_id))]
pub async fn act_on_contract(
    State(state): State<AppState>,
    session: Session,
    Path((id, action)): Path<(Uuid, ContractAction)>,
    body: Bytes,
) -> ApiResult<Json<ContractView>> {
    let req = ActionRequest::from_body(&body)?;
    let contract = services::apply_action(
        &state,
        &session,
        id,
        action,
        req.expected_version,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(ContractView::for_role(contract, session.role())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::repo_types::{ContractStatus, PaymentStatus};
    use crate::error::ApiError;
    use crate::listings::services::sample_listings;
    use crate::profiles::repo_types::Role;
    use crate::testing::register;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn full_lifecycle_through_handlers() {
        let state = AppState::fake();
        let farmer = register(&state, "Anita Patel", "anita@example.com", Role::Farmer).await;
        let buyer = register(&state, "Metro Supermarket", "metro@example.com", Role::Buyer).await;
        let mut listing = sample_listings(OffsetDateTime::now_utc()).remove(1);
        listing.farmer_id = farmer.profile.id;

        let proposed = services::propose_contract(
            &state,
            &buyer.session(),
            &listing,
            Decimal::from(10),
            Decimal::from(25),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

        let Json(view) = act_on_contract(
            State(state.clone()),
            farmer.session(),
            Path((proposed.id, ContractAction::Accept)),
            Bytes::from(format!(r#"{{"expected_version": {}}}"#, proposed.version)),
        )
        .await
        .unwrap();
        assert_eq!(view.contract.status, ContractStatus::Active);
        assert_eq!(view.actions, vec![ContractAction::Deliver]);

        let Json(view) = act_on_contract(
            State(state.clone()),
            buyer.session(),
            Path((proposed.id, ContractAction::Pay)),
            Bytes::new(),
        )
        .await
        .unwrap();
        assert_eq!(view.contract.payment_status, PaymentStatus::Completed);
        assert_eq!(view.total_value, Decimal::from(250));
        assert!(view.actions.is_empty());

        let Json(board) = dashboard(State(state.clone()), farmer.session()).await.unwrap();
        assert_eq!(board.counts.active, 1);
        assert_eq!(board.total, 1);

        let Json(seen) = get_contract(State(state.clone()), buyer.session(), Path(proposed.id))
            .await
            .unwrap();
        assert_eq!(seen.contract.version, 3);
    }

    #[tokio::test]
    async fn unknown_contract_is_not_found() {
        let state = AppState::fake();
        let buyer = register(&state, "Fresh Foods Inc.", "fresh@example.com", Role::Buyer).await;
        let err = act_on_contract(
            State(state.clone()),
            buyer.session(),
            Path((Uuid::new_v4(), ContractAction::Cancel)),
            Bytes::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_not_applied() {
        let state = AppState::fake();
        let farmer = register(&state, "Anita Patel", "anita@example.com", Role::Farmer).await;
        let buyer = register(&state, "Metro Supermarket", "metro@example.com", Role::Buyer).await;
        let mut listing = sample_listings(OffsetDateTime::now_utc()).remove(0);
        listing.farmer_id = farmer.profile.id;
        let proposed = services::propose_contract(
            &state,
            &buyer.session(),
            &listing,
            Decimal::from(5),
            Decimal::from(25),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

        for body in [r#"{"expected_version":"1"}"#, "{not json"] {
            let err = act_on_contract(
                State(state.clone()),
                farmer.session(),
                Path((proposed.id, ContractAction::Accept)),
                Bytes::from_static(body.as_bytes()),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{body}");
        }

        let stored = state.contracts.find(proposed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Pending);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn view_serializes_flat() {
        let c = crate::contracts::lifecycle::tests::contract(ContractStatus::Pending);
        let v = serde_json::to_value(ContractView::for_role(c, Role::Buyer)).unwrap();
        assert_eq!(v["status"], "pending");
        assert_eq!(v["payment_status"], "pending");
        assert_eq!(v["actions"], serde_json::json!(["cancel"]));
        assert!(v.get("contract").is_none());
    }
}
