use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::repo_types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Active => "active",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContractStatus::Pending),
            "active" => Ok(ContractStatus::Active),
            "completed" => Ok(ContractStatus::Completed),
            "cancelled" => Ok(ContractStatus::Cancelled),
            other => anyhow::bail!("unknown contract status {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            other => anyhow::bail!("unknown payment status {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contract {
    pub id: Uuid,
    pub listing_id: Option<Uuid>,
    pub crop_name: String,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: ContractStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_by: Option<Role>,
    pub cancellation_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub delivery_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
    pub version: i64,
}

impl Contract {
    /// Quantity times price, saturating at `Decimal::MAX`.
    pub fn total_value(&self) -> Decimal {
        self.quantity.saturating_mul(self.price)
    }

    /// The party id playing `role` on this contract.
    pub fn party(&self, role: Role) -> Uuid {
        match role {
            Role::Farmer => self.farmer_id,
            Role::Buyer => self.buyer_id,
        }
    }
}

/// A proposal about to be written; status and payment start as pending.
#[derive(Debug, Clone)]
pub struct NewContract {
    pub listing_id: Option<Uuid>,
    pub crop_name: String,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub created_at: OffsetDateTime,
    pub delivery_date: OffsetDateTime,
}

/// Field values a lifecycle action writes. Unset optionals keep the stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractUpdate {
    pub status: ContractStatus,
    pub payment_status: PaymentStatus,
    pub cancelled_by: Option<Role>,
    pub cancellation_reason: Option<String>,
    pub delivered_at: Option<OffsetDateTime>,
    pub paid_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

impl ContractUpdate {
    /// Applies the update in place and bumps the version.
    pub fn apply_to(&self, c: &mut Contract) {
        c.status = self.status;
        c.payment_status = self.payment_status;
        if self.cancelled_by.is_some() {
            c.cancelled_by = self.cancelled_by;
        }
        if self.cancellation_reason.is_some() {
            c.cancellation_reason = self.cancellation_reason.clone();
        }
        if self.delivered_at.is_some() {
            c.delivered_at = self.delivered_at;
        }
        if self.paid_at.is_some() {
            c.paid_at = self.paid_at;
        }
        c.updated_at = Some(self.updated_at);
        c.version += 1;
    }
}

#[derive(Debug, FromRow)]
pub struct ContractRow {
    pub id: Uuid,
    pub listing_id: Option<Uuid>,
    pub crop_name: String,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: String,
    pub payment_status: String,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub delivery_date: OffsetDateTime,
    pub delivered_at: Option<OffsetDateTime>,
    pub paid_at: Option<OffsetDateTime>,
    pub version: i64,
}

impl TryFrom<ContractRow> for Contract {
    type Error = anyhow::Error;

    fn try_from(r: ContractRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            listing_id: r.listing_id,
            crop_name: r.crop_name,
            farmer_id: r.farmer_id,
            farmer_name: r.farmer_name,
            buyer_id: r.buyer_id,
            buyer_name: r.buyer_name,
            quantity: r.quantity,
            price: r.price,
            status: r.status.parse()?,
            payment_status: r.payment_status.parse()?,
            cancelled_by: r.cancelled_by.as_deref().map(str::parse).transpose()?,
            cancellation_reason: r.cancellation_reason,
            created_at: r.created_at,
            updated_at: r.updated_at,
            delivery_date: r.delivery_date,
            delivered_at: r.delivered_at,
            paid_at: r.paid_at,
            version: r.version,
        })
    }
}
