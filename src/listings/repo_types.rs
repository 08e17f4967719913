use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(pub(crate) iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Vegetables,
    Fruits,
    Grains,
    Dairy,
    Poultry,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Vegetables,
        Category::Fruits,
        Category::Grains,
        Category::Dairy,
        Category::Poultry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vegetables => "Vegetables",
            Category::Fruits => "Fruits",
            Category::Grains => "Grains",
            Category::Dairy => "Dairy",
            Category::Poultry => "Poultry",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown category {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub crop_name: String,
    pub category: Category,
    pub available_quantity: Decimal,
    pub min_price: Decimal,
    pub description: String,
    pub location: String,
    #[serde(with = "iso_date")]
    pub harvest_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied when a farmer publishes a listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub crop_name: String,
    pub category: Category,
    pub available_quantity: Decimal,
    pub min_price: Decimal,
    pub description: String,
    pub location: String,
    pub harvest_date: Date,
}

#[derive(Debug, FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub crop_name: String,
    pub category: String,
    pub available_quantity: Decimal,
    pub min_price: Decimal,
    pub description: String,
    pub location: String,
    pub harvest_date: Date,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ListingRow> for Listing {
    type Error = anyhow::Error;

    fn try_from(r: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            farmer_id: r.farmer_id,
            farmer_name: r.farmer_name,
            crop_name: r.crop_name,
            category: r.category.parse()?,
            available_quantity: r.available_quantity,
            min_price: r.min_price,
            description: r.description,
            location: r.location,
            harvest_date: r.harvest_date,
            created_at: r.created_at,
        })
    }
}
