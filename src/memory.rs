//! In-process store used for `STORE_BACKEND=memory` and in tests.
//!
//! Mirrors the Postgres constraints that matter to callers: unique emails
//! and version-guarded contract writes.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::AccountRepo,
        repo_types::{Account, EmailTaken, NewAccount, SessionRecord},
    },
    contracts::{
        repo::ContractRepo,
        repo_types::{Contract, ContractStatus, ContractUpdate, NewContract, PaymentStatus},
    },
    listings::{
        repo::ListingRepo,
        repo_types::{Listing, NewListing},
    },
    profiles::{
        repo::ProfileRepo,
        repo_types::{ProfileChanges, Role, UserProfile},
    },
};

#[derive(Debug, Clone)]
struct UserRecord {
    account: Account,
    profile: UserProfile,
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
    listings: RwLock<Vec<Listing>>,
    contracts: RwLock<HashMap<Uuid, Contract>>,
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.account.email == email)
            .map(|u| u.account.clone()))
    }

    async fn create(&self, new: NewAccount) -> anyhow::Result<UserProfile> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.account.email == new.email) {
            return Err(EmailTaken.into());
        }
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let profile = UserProfile {
            id,
            full_name: new.full_name,
            email: new.email.clone(),
            role: new.role,
            location: None,
            phone: None,
            created_at: now,
            updated_at: None,
        };
        users.insert(
            id,
            UserRecord {
                account: Account {
                    id,
                    email: new.email,
                    password_hash: new.password_hash,
                    created_at: now,
                },
                profile: profile.clone(),
            },
        );
        Ok(profile)
    }

    async fn open_session(&self, user_id: Uuid) -> anyhow::Result<SessionRecord> {
        let session = SessionRecord {
            id: Uuid::new_v4(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            revoked_at: None,
        };
        self.sessions.write().await.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> anyhow::Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn revoke_session(&self, session_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(s) if s.is_open() => {
                s.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn find(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(&user_id).map(|u| u.profile.clone()))
    }

    async fn update(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<UserProfile>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        let p = &mut user.profile;
        p.full_name = changes.full_name.clone();
        p.location = changes.location.clone();
        p.phone = changes.phone.clone();
        p.role = changes.role;
        p.updated_at = Some(now);
        Ok(Some(p.clone()))
    }
}

#[async_trait]
impl ListingRepo for MemoryStore {
    async fn list_all(&self) -> anyhow::Result<Vec<Listing>> {
        let mut all = self.listings.read().await.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        Ok(self.listings.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing> {
        let listing = Listing {
            id: Uuid::new_v4(),
            farmer_id: new.farmer_id,
            farmer_name: new.farmer_name,
            crop_name: new.crop_name,
            category: new.category,
            available_quantity: new.available_quantity,
            min_price: new.min_price,
            description: new.description,
            location: new.location,
            harvest_date: new.harvest_date,
            created_at: OffsetDateTime::now_utc(),
        };
        self.listings.write().await.push(listing.clone());
        Ok(listing)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.listings.read().await.len() as i64)
    }
}

#[async_trait]
impl ContractRepo for MemoryStore {
    async fn insert(&self, new: NewContract) -> anyhow::Result<Contract> {
        let contract = Contract {
            id: Uuid::new_v4(),
            listing_id: new.listing_id,
            crop_name: new.crop_name,
            farmer_id: new.farmer_id,
            farmer_name: new.farmer_name,
            buyer_id: new.buyer_id,
            buyer_name: new.buyer_name,
            quantity: new.quantity,
            price: new.price,
            status: ContractStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancelled_by: None,
            cancellation_reason: None,
            created_at: new.created_at,
            updated_at: None,
            delivery_date: new.delivery_date,
            delivered_at: None,
            paid_at: None,
            version: 1,
        };
        self.contracts.write().await.insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Contract>> {
        Ok(self.contracts.read().await.get(&id).cloned())
    }

    async fn list_for_party(&self, role: Role, user_id: Uuid) -> anyhow::Result<Vec<Contract>> {
        let mut mine: Vec<Contract> = self
            .contracts
            .read()
            .await
            .values()
            .filter(|c| c.party(role) == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn apply_update(
        &self,
        id: Uuid,
        expected_version: i64,
        update: &ContractUpdate,
    ) -> anyhow::Result<Option<Contract>> {
        let mut contracts = self.contracts.write().await;
        match contracts.get_mut(&id) {
            Some(c) if c.version == expected_version => {
                update.apply_to(c);
                Ok(Some(c.clone()))
            }
            _ => Ok(None),
        }
    }
}
