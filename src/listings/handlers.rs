use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateListingRequest, MarketplaceQuery, MarketplaceResponse, ProposalRequest},
    repo_types::Listing,
    services::{
        filter_listings, load_marketplace, parse_category_filter, proposal_draft,
        validate_new_listing, ProposalDraft,
    },
};
use crate::{
    auth::extractors::Session,
    contracts::{dto::ContractView, services::propose_contract},
    error::{ApiError, ApiResult},
    profiles::repo_types::Role,
    state::AppState,
};

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/marketplace", get(marketplace))
        .route("/marketplace/:listing_id/proposal", get(draft_proposal))
        .route("/marketplace/:listing_id/proposals", post(submit_proposal))
        .route("/create-listing", post(create_listing))
        .route("/listings/:id", get(get_listing))
}

async fn stored_listing(state: &AppState, id: Uuid) -> ApiResult<Listing> {
    state
        .listings
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))
}

#[instrument(skip(state))]
pub async fn marketplace(
    State(state): State<AppState>,
    Query(q): Query<MarketplaceQuery>,
) -> ApiResult<Json<MarketplaceResponse>> {
    let category = parse_category_filter(q.category.as_deref())?;
    let mut snapshot = load_marketplace(
        state.listings.as_ref(),
        state.config.marketplace.sample_fallback,
        OffsetDateTime::now_utc(),
    )
    .await?;

    snapshot.listings = filter_listings(&snapshot.listings, q.search.as_deref().unwrap_or(""), category);
    let total = snapshot.listings.len();
    Ok(Json(MarketplaceResponse { snapshot, total }))
}

#[instrument(skip(state))]
pub async fn get_listing(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Listing>> {
    Ok(Json(stored_listing(&state, id).await?))
}

#[instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn draft_proposal(
    State(state): State<AppState>,
    session: Session,
    Path(listing_id): Path<Uuid>,
) -> ApiResult<Json<ProposalDraft>> {
    session.require_role(Role::Buyer)?;
    let listing = stored_listing(&state, listing_id).await?;
    Ok(Json(proposal_draft(&listing)))
}

#[instrument(skip(state, session, payload), fields(user_id = %session.user_id))]
pub async fn submit_proposal(
    State(state): State<AppState>,
    session: Session,
    Path(listing_id): Path<Uuid>,
    Json(payload): Json<ProposalRequest>,
) -> ApiResult<(StatusCode, Json<ContractView>)> {
    session.require_role(Role::Buyer)?;
    let listing = stored_listing(&state, listing_id).await?;
    let contract = propose_contract(
        &state,
        &session,
        &listing,
        payload.quantity,
        payload.price,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ContractView::for_role(contract, Role::Buyer))))
}

#[instrument(skip(state, session, payload), fields(user_id = %session.user_id))]
pub async fn create_listing(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateListingRequest>,
) -> ApiResult<(StatusCode, Json<Listing>)> {
    session.require_role(Role::Farmer)?;
    let now = OffsetDateTime::now_utc();
    let new = validate_new_listing(&session.profile, payload, now.date())?;
    let listing = state.listings.insert(new).await?;
    info!(listing_id = %listing.id, crop = %listing.crop_name, "listing created");
    Ok((StatusCode::CREATED, Json(listing)))
}
