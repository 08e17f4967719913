use rust_decimal::Decimal;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{error, warn};
use uuid::Uuid;

use super::{
    dto::CreateListingRequest,
    repo::ListingRepo,
    repo_types::{Category, Listing, NewListing},
};
use crate::{error::ApiError, profiles::repo_types::UserProfile};

/// Largest quantity a proposal draft starts with.
pub const DEFAULT_PROPOSAL_QUANTITY: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    Store,
    Sample,
}

/// What the marketplace shows and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceSnapshot {
    pub listings: Vec<Listing>,
    pub source: ListingSource,
    /// The store could not be read; `listings` are not live data.
    pub degraded: bool,
    pub notice: Option<String>,
}

/// Listings served when the store has nothing to show.
pub fn sample_listings(now: OffsetDateTime) -> Vec<Listing> {
    let sample = |n: u128,
                  farmer_name: &str,
                  crop_name: &str,
                  category: Category,
                  quantity: i64,
                  price: i64,
                  description: &str,
                  location: &str,
                  harvest_in_days: i64| Listing {
        id: Uuid::from_u128(0x5a3b_0000_0000_0000_0000_0000_0000_0000 | n),
        farmer_id: Uuid::from_u128(0x5a3b_f000_0000_0000_0000_0000_0000_0000 | n),
        farmer_name: farmer_name.into(),
        crop_name: crop_name.into(),
        category,
        available_quantity: Decimal::from(quantity),
        min_price: Decimal::from(price),
        description: description.into(),
        location: location.into(),
        harvest_date: (now + Duration::days(harvest_in_days)).date(),
        created_at: now,
    };

    vec![
        sample(
            1,
            "Rajesh Kumar",
            "Organic Tomatoes",
            Category::Vegetables,
            500,
            25,
            "Fresh organic tomatoes grown without pesticides. Ideal for restaurants and food \
             processors looking for quality produce.",
            "Nashik, Maharashtra",
            15,
        ),
        sample(
            2,
            "Anita Patel",
            "Basmati Rice",
            Category::Grains,
            1000,
            60,
            "Premium quality basmati rice with exceptional aroma. Long grain variety suitable \
             for export and premium restaurants.",
            "Karnal, Haryana",
            45,
        ),
        sample(
            3,
            "Mohammed Khan",
            "Alphonso Mangoes",
            Category::Fruits,
            300,
            200,
            "The king of mangoes! Premium Alphonso mangoes known for their sweet taste and \
             aromatic flavor. Perfect for direct consumption and pulp production.",
            "Ratnagiri, Maharashtra",
            30,
        ),
    ]
}

/// Reads every listing, falling back to [`sample_listings`] when allowed.
pub async fn load_marketplace(
    repo: &dyn ListingRepo,
    sample_fallback: bool,
    now: OffsetDateTime,
) -> Result<MarketplaceSnapshot, ApiError> {
    match repo.list_all().await {
        Ok(listings) if !listings.is_empty() || !sample_fallback => Ok(MarketplaceSnapshot {
            listings,
            source: ListingSource::Store,
            degraded: false,
            notice: None,
        }),
        Ok(_) => Ok(MarketplaceSnapshot {
            listings: sample_listings(now),
            source: ListingSource::Sample,
            degraded: false,
            notice: Some("No listings yet. Showing sample listings.".into()),
        }),
        Err(e) if sample_fallback => {
            warn!(error = %e, "listing store unreachable; serving sample listings");
            Ok(MarketplaceSnapshot {
                listings: sample_listings(now),
                source: ListingSource::Sample,
                degraded: true,
                notice: Some("Unable to connect to database. Showing sample data instead.".into()),
            })
        }
        Err(e) => {
            error!(error = %e, "listing store unreachable");
            Err(ApiError::Unavailable(
                "Unable to load listings. Please try again later.".into(),
            ))
        }
    }
}

/// Case-insensitive text search over crop, farmer and description, intersected
/// with an exact category match. An empty search or `None` category matches all.
pub fn filter_listings(listings: &[Listing], search: &str, category: Option<Category>) -> Vec<Listing> {
    let needle = search.trim().to_lowercase();
    listings
        .iter()
        .filter(|l| {
            needle.is_empty()
                || l.crop_name.to_lowercase().contains(&needle)
                || l.farmer_name.to_lowercase().contains(&needle)
                || l.description.to_lowercase().contains(&needle)
        })
        .filter(|l| category.map_or(true, |c| l.category == c))
        .cloned()
        .collect()
}

/// Parses the category filter; absent, empty, or `all` means no filter.
pub fn parse_category_filter(raw: Option<&str>) -> Result<Option<Category>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s
            .parse::<Category>()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalDraft {
    pub listing_id: Uuid,
    pub crop_name: String,
    pub farmer_name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub max_quantity: Decimal,
    pub total_value: Decimal,
}

pub fn proposal_draft(listing: &Listing) -> ProposalDraft {
    let quantity = listing
        .available_quantity
        .min(Decimal::from(DEFAULT_PROPOSAL_QUANTITY));
    let price = listing.min_price;
    ProposalDraft {
        listing_id: listing.id,
        crop_name: listing.crop_name.clone(),
        farmer_name: listing.farmer_name.clone(),
        quantity,
        price,
        max_quantity: listing.available_quantity,
        total_value: quantity.saturating_mul(price),
    }
}

fn min_len(field: &str, value: &str, min: usize) -> Result<String, ApiError> {
    let v = value.trim();
    if v.chars().count() < min {
        return Err(ApiError::BadRequest(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(v.to_string())
}

/// Checks the create-listing form and binds it to the publishing farmer.
pub fn validate_new_listing(
    farmer: &UserProfile,
    req: CreateListingRequest,
    today: time::Date,
) -> Result<NewListing, ApiError> {
    let crop_name = min_len("Crop name", &req.crop_name, 2)?;
    let category = req
        .category
        .parse::<Category>()
        .map_err(|_| ApiError::BadRequest("Please select a valid category".into()))?;
    if req.available_quantity <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Quantity must be a positive number".into()));
    }
    if req.min_price <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Price must be a positive number".into()));
    }
    if req.available_quantity.checked_mul(req.min_price).is_none() {
        return Err(ApiError::BadRequest("Quantity and price are too large".into()));
    }
    let description = min_len("Description", &req.description, 10)?;
    let location = min_len("Location", &req.location, 2)?;
    if req.harvest_date < today {
        return Err(ApiError::BadRequest("Harvest date cannot be in the past".into()));
    }

    Ok(NewListing {
        farmer_id: farmer.id,
        farmer_name: farmer.full_name.clone(),
        crop_name,
        category,
        available_quantity: req.available_quantity,
        min_price: req.min_price,
        description,
        location,
        harvest_date: req.harvest_date,
    })
}

/// Inserts the sample listings into an empty store. Returns how many were written.
pub async fn seed_sample_listings(repo: &dyn ListingRepo, now: OffsetDateTime) -> anyhow::Result<usize> {
    if repo.count().await? > 0 {
        return Ok(0);
    }
    let mut written = 0;
    for l in sample_listings(now) {
        repo.insert(NewListing {
            farmer_id: l.farmer_id,
            farmer_name: l.farmer_name,
            crop_name: l.crop_name,
            category: l.category,
            available_quantity: l.available_quantity,
            min_price: l.min_price,
            description: l.description,
            location: l.location,
            harvest_date: l.harvest_date,
        })
        .await?;
        written += 1;
    }
    Ok(written)
}
