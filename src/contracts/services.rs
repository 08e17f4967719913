use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ContractView, DashboardResponse, StatusCounts},
    lifecycle::{plan, ContractAction},
    repo_types::{Contract, ContractStatus, NewContract},
};
use crate::{
    auth::extractors::Session,
    error::ApiError,
    listings::repo_types::Listing,
    profiles::repo_types::Role,
    state::AppState,
};

/// Days between a proposal and its delivery date.
pub const DELIVERY_WINDOW_DAYS: i64 = 30;

/// Contracts split by status. Every input contract lands in exactly one bucket.
#[derive(Debug, Default)]
pub struct StatusBuckets {
    pub active: Vec<Contract>,
    pub pending: Vec<Contract>,
    pub completed: Vec<Contract>,
    pub cancelled: Vec<Contract>,
}

impl StatusBuckets {
    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            active: self.active.len(),
            pending: self.pending.len(),
            completed: self.completed.len(),
            cancelled: self.cancelled.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.active.len() + self.pending.len() + self.completed.len() + self.cancelled.len()
    }
}

pub fn group_by_status(contracts: Vec<Contract>) -> StatusBuckets {
    let mut buckets = StatusBuckets::default();
    for c in contracts {
        match c.status {
            ContractStatus::Active => buckets.active.push(c),
            ContractStatus::Pending => buckets.pending.push(c),
            ContractStatus::Completed => buckets.completed.push(c),
            ContractStatus::Cancelled => buckets.cancelled.push(c),
        }
    }
    buckets
}

pub async fn dashboard(state: &AppState, session: &Session) -> Result<DashboardResponse, ApiError> {
    let role = session.role();
    let contracts = state.contracts.list_for_party(role, session.user_id).await?;
    let buckets = group_by_status(contracts);
    let view = |v: Vec<Contract>| -> Vec<ContractView> {
        v.into_iter().map(|c| ContractView::for_role(c, role)).collect()
    };
    Ok(DashboardResponse {
        role,
        total: buckets.total(),
        counts: buckets.counts(),
        active: view(buckets.active),
        pending: view(buckets.pending),
        completed: view(buckets.completed),
        cancelled: view(buckets.cancelled),
    })
}

/// Creates a pending contract from a buyer's proposal on `listing`.
pub async fn propose_contract(
    state: &AppState,
    buyer: &Session,
    listing: &Listing,
    quantity: Decimal,
    price: Decimal,
    now: OffsetDateTime,
) -> Result<Contract, ApiError> {
    buyer.require_role(Role::Buyer)?;
    if quantity <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Quantity must be a positive number".into()));
    }
    if quantity > listing.available_quantity {
        return Err(ApiError::BadRequest(format!(
            "Quantity exceeds the {} kg available",
            listing.available_quantity
        )));
    }
    if price <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Price must be a positive number".into()));
    }
    if quantity.checked_mul(price).is_none() {
        return Err(ApiError::BadRequest("Quantity and price are too large".into()));
    }

    let contract = state
        .contracts
        .insert(NewContract {
            listing_id: Some(listing.id),
            crop_name: listing.crop_name.clone(),
            farmer_id: listing.farmer_id,
            farmer_name: listing.farmer_name.clone(),
            buyer_id: buyer.user_id,
            buyer_name: buyer.profile.full_name.clone(),
            quantity,
            price,
            created_at: now,
            delivery_date: now + Duration::days(DELIVERY_WINDOW_DAYS),
        })
        .await?;
    info!(contract_id = %contract.id, listing_id = %listing.id, buyer_id = %buyer.user_id, "contract proposed");
    Ok(contract)
}

/// Loads a contract the caller is a party to, in the caller's role.
pub async fn load_for_party(state: &AppState, session: &Session, id: Uuid) -> Result<Contract, ApiError> {
    let contract = state
        .contracts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contract not found".into()))?;
    if contract.party(session.role()) != session.user_id {
        return Err(ApiError::NotFound("Contract not found".into()));
    }
    Ok(contract)
}

/// Runs a lifecycle action as a version-guarded write and returns the stored result.
pub async fn apply_action(
    state: &AppState,
    session: &Session,
    id: Uuid,
    action: ContractAction,
    expected_version: Option<i64>,
    now: OffsetDateTime,
) -> Result<Contract, ApiError> {
    let role = session.role();
    let current = state
        .contracts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contract not found".into()))?;

    let actor = action.actor();
    if current.party(actor) != session.user_id {
        if current.farmer_id == session.user_id || current.buyer_id == session.user_id {
            return Err(ApiError::Forbidden(format!("Only the {actor} may {action} this contract")));
        }
        return Err(ApiError::NotFound("Contract not found".into()));
    }

    if let Some(expected) = expected_version {
        if expected != current.version {
            return Err(ApiError::Conflict(format!(
                "Contract changed since version {expected}; it is now {} at version {}",
                current.status, current.version
            )));
        }
    }

    let update = plan(&current, action, role, now)?;

    match state.contracts.apply_update(id, current.version, &update).await? {
        Some(stored) => {
            info!(contract_id = %id, %action, status = %stored.status, version = stored.version, "contract updated");
            Ok(stored)
        }
        None => {
            let latest = state.contracts.find(id).await?;
            warn!(contract_id = %id, %action, "contract write lost a race");
            Err(ApiError::Conflict(match latest {
                Some(c) => format!(
                    "Contract was modified concurrently; it is now {} at version {}",
                    c.status, c.version
                ),
                None => "Contract was modified concurrently".into(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::lifecycle::tests::contract;
    use crate::contracts::repo_types::PaymentStatus;
    use crate::listings::services::sample_listings;
    use crate::testing::{register, TestUser};
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        datetime!(2026-10-18 10:00 UTC)
    }

    async fn parties(state: &AppState) -> (TestUser, TestUser, Listing) {
        let farmer = register(state, "Rajesh Kumar", "rajesh@example.com", Role::Farmer).await;
        let buyer = register(state, "Fresh Foods Inc.", "buyer@example.com", Role::Buyer).await;
        let mut listing = sample_listings(now()).remove(0);
        listing.farmer_id = farmer.profile.id;
        (farmer, buyer, listing)
    }

    #[test]
    fn grouping_partitions_every_contract() {
        let statuses = [
            ContractStatus::Active,
            ContractStatus::Pending,
            ContractStatus::Pending,
            ContractStatus::Completed,
            ContractStatus::Cancelled,
            ContractStatus::Cancelled,
            ContractStatus::Cancelled,
        ];
        let all: Vec<Contract> = statuses.iter().map(|s| contract(*s)).collect();
        let ids: Vec<Uuid> = all.iter().map(|c| c.id).collect();

        let buckets = group_by_status(all);
        assert_eq!(buckets.total(), statuses.len());
        let counts = buckets.counts();
        assert_eq!(
            counts,
            StatusCounts {
                active: 1,
                pending: 2,
                completed: 1,
                cancelled: 3
            }
        );

        let mut seen: Vec<Uuid> = [&buckets.active, &buckets.pending, &buckets.completed, &buckets.cancelled]
            .into_iter()
            .flatten()
            .map(|c| c.id)
            .collect();
        let mut expected = ids;
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
        assert!(buckets.pending.iter().all(|c| c.status == ContractStatus::Pending));
    }

    #[tokio::test]
    async fn proposal_total_is_exact_and_delivery_is_thirty_days_out() {
        let state = AppState::fake();
        let (_, buyer, listing) = parties(&state).await;

        let c = propose_contract(&state, &buyer.session(), &listing, Decimal::from(10), Decimal::from(25), now())
            .await
            .unwrap();
        assert_eq!(c.status, ContractStatus::Pending);
        assert_eq!(c.payment_status, PaymentStatus::Pending);
        assert_eq!(c.total_value(), Decimal::from(250));
        assert_eq!(c.delivery_date, datetime!(2026-11-17 10:00 UTC));
        assert_eq!(c.buyer_name, "Fresh Foods Inc.");
        assert_eq!(c.farmer_id, listing.farmer_id);
        assert_eq!(c.version, 1);
    }

    #[tokio::test]
    async fn proposal_rules() {
        let state = AppState::fake();
        let (farmer, buyer, listing) = parties(&state).await;

        let err = propose_contract(&state, &farmer.session(), &listing, Decimal::from(1), Decimal::from(25), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let too_many = listing.available_quantity + Decimal::ONE;
        let err = propose_contract(&state, &buyer.session(), &listing, too_many, Decimal::from(25), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = propose_contract(&state, &buyer.session(), &listing, Decimal::from(5), Decimal::ZERO, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn overflowing_total_is_refused_and_dashboards_stay_readable() {
        let state = AppState::fake();
        let (farmer, buyer, listing) = parties(&state).await;

        let huge = Decimal::MAX / Decimal::from(2);
        let err = propose_contract(&state, &buyer.session(), &listing, Decimal::from(10), huge, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let board = dashboard(&state, &farmer.session()).await.unwrap();
        assert_eq!(board.total, 0);
    }

    #[test]
    fn oversized_stored_contract_still_renders() {
        let mut c = contract(ContractStatus::Pending);
        c.quantity = Decimal::MAX;
        c.price = Decimal::from(2);
        let view = ContractView::for_role(c, Role::Farmer);
        assert_eq!(view.total_value, Decimal::MAX);
        assert_eq!(view.actions, vec![ContractAction::Accept, ContractAction::Decline]);
    }

    #[tokio::test]
    async fn accept_then_pay_then_deliver() {
        let state = AppState::fake();
        let (farmer, buyer, listing) = parties(&state).await;
        let c = propose_contract(&state, &buyer.session(), &listing, Decimal::from(10), Decimal::from(25), now())
            .await
            .unwrap();

        let accepted = apply_action(&state, &farmer.session(), c.id, ContractAction::Accept, Some(1), now())
            .await
            .unwrap();
        assert_eq!(accepted.status, ContractStatus::Active);
        assert_eq!(accepted.quantity, c.quantity);
        assert_eq!(accepted.price, c.price);
        assert_eq!(accepted.version, 2);

        let paid = apply_action(&state, &buyer.session(), c.id, ContractAction::Pay, None, now())
            .await
            .unwrap();
        assert_eq!(paid.status, ContractStatus::Active);
        assert_eq!(paid.payment_status, PaymentStatus::Completed);

        let delivered = apply_action(&state, &farmer.session(), c.id, ContractAction::Deliver, None, now())
            .await
            .unwrap();
        assert_eq!(delivered.status, ContractStatus::Completed);
        assert_eq!(delivered.payment_status, PaymentStatus::Completed);
        assert_eq!(delivered.version, 4);
    }

    #[tokio::test]
    async fn stale_version_and_terminal_state_conflict() {
        let state = AppState::fake();
        let (farmer, buyer, listing) = parties(&state).await;
        let c = propose_contract(&state, &buyer.session(), &listing, Decimal::from(3), Decimal::from(30), now())
            .await
            .unwrap();

        apply_action(&state, &buyer.session(), c.id, ContractAction::Cancel, None, now())
            .await
            .unwrap();

        // farmer still looking at version 1
        let err = apply_action(&state, &farmer.session(), c.id, ContractAction::Decline, Some(1), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(err.to_string().contains("cancelled"));

        let err = apply_action(&state, &farmer.session(), c.id, ContractAction::Accept, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn outsiders_and_wrong_party_are_refused() {
        let state = AppState::fake();
        let (_, buyer, listing) = parties(&state).await;
        let stranger = register(&state, "Metro Supermarket", "metro@example.com", Role::Farmer).await;
        let c = propose_contract(&state, &buyer.session(), &listing, Decimal::from(3), Decimal::from(30), now())
            .await
            .unwrap();

        let err = apply_action(&state, &stranger.session(), c.id, ContractAction::Accept, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = apply_action(&state, &buyer.session(), c.id, ContractAction::Accept, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = load_for_party(&state, &stranger.session(), c.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn dashboard_is_scoped_and_partitioned() {
        let state = AppState::fake();
        let (farmer, buyer, listing) = parties(&state).await;
        for qty in [1, 2, 3] {
            propose_contract(&state, &buyer.session(), &listing, Decimal::from(qty), Decimal::from(25), now())
                .await
                .unwrap();
        }
        let other_buyer = register(&state, "Spice Traders Ltd.", "spice@example.com", Role::Buyer).await;
        let theirs = propose_contract(&state, &other_buyer.session(), &listing, Decimal::from(4), Decimal::from(25), now())
            .await
            .unwrap();
        apply_action(&state, &farmer.session(), theirs.id, ContractAction::Decline, None, now())
            .await
            .unwrap();

        let board = dashboard(&state, &buyer.session()).await.unwrap();
        assert_eq!(board.role, Role::Buyer);
        assert_eq!(board.total, 3);
        assert_eq!(board.counts.pending, 3);
        assert!(board.pending.iter().all(|v| v.actions == vec![ContractAction::Cancel]));

        let board = dashboard(&state, &farmer.session()).await.unwrap();
        assert_eq!(board.total, 4);
        let c = board.counts;
        assert_eq!(c.active + c.pending + c.completed + c.cancelled, board.total);
        assert_eq!(c.cancelled, 1);
        assert!(board.cancelled[0].actions.is_empty());
    }
}
