use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Listing, ListingRow, NewListing};

#[async_trait]
pub trait ListingRepo: Send + Sync {
    async fn list_all(&self) -> anyhow::Result<Vec<Listing>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Listing>>;
    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing>;
    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgListingRepo {
    db: PgPool,
}

impl PgListingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const LISTING_COLUMNS: &str = "id, farmer_id, farmer_name, crop_name, category, \
    available_quantity, min_price, description, location, harvest_date, created_at";

#[async_trait]
impl ListingRepo for PgListingRepo {
    async fn list_all(&self) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list listings")?;
        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select listing")?;
        row.map(Listing::try_from).transpose()
    }

    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO listings (id, farmer_id, farmer_name, crop_name, category,
                                  available_quantity, min_price, description, location, harvest_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.farmer_id)
        .bind(&new.farmer_name)
        .bind(&new.crop_name)
        .bind(new.category.as_str())
        .bind(new.available_quantity)
        .bind(new.min_price)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.harvest_date)
        .fetch_one(&self.db)
        .await
        .context("insert listing")?;
        Listing::try_from(row)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.db)
            .await
            .context("count listings")?;
        Ok(n)
    }
}
