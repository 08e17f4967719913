use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Contract, ContractRow, ContractUpdate, NewContract};
use crate::profiles::repo_types::Role;

#[async_trait]
pub trait ContractRepo: Send + Sync {
    async fn insert(&self, new: NewContract) -> anyhow::Result<Contract>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Contract>>;

    /// Contracts where `user_id` is the party playing `role`, newest first.
    async fn list_for_party(&self, role: Role, user_id: Uuid) -> anyhow::Result<Vec<Contract>>;

    /// Writes `update` only if the stored version still equals `expected_version`.
    /// Returns `None` when the contract is missing or was changed in between.
    async fn apply_update(
        &self,
        id: Uuid,
        expected_version: i64,
        update: &ContractUpdate,
    ) -> anyhow::Result<Option<Contract>>;
}

#[derive(Clone)]
pub struct PgContractRepo {
    db: PgPool,
}

impl PgContractRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const CONTRACT_COLUMNS: &str = "id, listing_id, crop_name, farmer_id, farmer_name, buyer_id, \
    buyer_name, quantity, price, status, payment_status, cancelled_by, cancellation_reason, \
    created_at, updated_at, delivery_date, delivered_at, paid_at, version";

#[async_trait]
impl ContractRepo for PgContractRepo {
    async fn insert(&self, new: NewContract) -> anyhow::Result<Contract> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            INSERT INTO contracts (id, listing_id, crop_name, farmer_id, farmer_name, buyer_id,
                                   buyer_name, quantity, price, status, payment_status,
                                   created_at, delivery_date, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', 'pending', $10, $11, 1)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.listing_id)
        .bind(&new.crop_name)
        .bind(new.farmer_id)
        .bind(&new.farmer_name)
        .bind(new.buyer_id)
        .bind(&new.buyer_name)
        .bind(new.quantity)
        .bind(new.price)
        .bind(new.created_at)
        .bind(new.delivery_date)
        .fetch_one(&self.db)
        .await
        .context("insert contract")?;
        Contract::try_from(row)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Contract>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select contract")?;
        row.map(Contract::try_from).transpose()
    }

    async fn list_for_party(&self, role: Role, user_id: Uuid) -> anyhow::Result<Vec<Contract>> {
        let column = match role {
            Role::Farmer => "farmer_id",
            Role::Buyer => "buyer_id",
        };
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE {column} = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list contracts by {column}"))?;
        rows.into_iter().map(Contract::try_from).collect()
    }

    async fn apply_update(
        &self,
        id: Uuid,
        expected_version: i64,
        update: &ContractUpdate,
    ) -> anyhow::Result<Option<Contract>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            UPDATE contracts
               SET status = $3,
                   payment_status = $4,
                   cancelled_by = COALESCE($5, cancelled_by),
                   cancellation_reason = COALESCE($6, cancellation_reason),
                   delivered_at = COALESCE($7, delivered_at),
                   paid_at = COALESCE($8, paid_at),
                   updated_at = $9,
                   version = version + 1
             WHERE id = $1 AND version = $2
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected_version)
        .bind(update.status.as_str())
        .bind(update.payment_status.as_str())
        .bind(update.cancelled_by.map(Role::as_str))
        .bind(&update.cancellation_reason)
        .bind(update.delivered_at)
        .bind(update.paid_at)
        .bind(update.updated_at)
        .fetch_optional(&self.db)
        .await
        .context("update contract")?;
        row.map(Contract::try_from).transpose()
    }
}
