use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use super::{repo_types::iso_date, services::MarketplaceSnapshot};

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub crop_name: String,
    pub category: String,
    pub available_quantity: Decimal,
    pub min_price: Decimal,
    pub description: String,
    pub location: String,
    #[serde(with = "iso_date")]
    pub harvest_date: Date,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarketplaceQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalRequest {
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MarketplaceResponse {
    #[serde(flatten)]
    pub snapshot: MarketplaceSnapshot,
    pub total: usize,
}
