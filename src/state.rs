use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::{
    auth::repo::{AccountRepo, PgAccountRepo},
    config::{AppConfig, StoreBackend},
    contracts::repo::{ContractRepo, PgContractRepo},
    listings::repo::{ListingRepo, PgListingRepo},
    memory::MemoryStore,
    profiles::repo::{PgProfileRepo, ProfileRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: Arc<dyn AccountRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub listings: Arc<dyn ListingRepo>,
    pub contracts: Arc<dyn ContractRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await
                    .context("connect to postgres")?;

                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
                }

                info!(max_connections = config.max_connections, "using postgres store");
                Ok(Self {
                    accounts: Arc::new(PgAccountRepo::new(db.clone())),
                    profiles: Arc::new(PgProfileRepo::new(db.clone())),
                    listings: Arc::new(PgListingRepo::new(db.clone())),
                    contracts: Arc::new(PgContractRepo::new(db)),
                    config,
                })
            }
            StoreBackend::Memory => {
                info!("using in-memory store; data is lost on restart");
                Ok(Self::with_memory_store(config))
            }
        }
    }

    pub fn with_memory_store(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            config,
            accounts: store.clone(),
            profiles: store.clone(),
            listings: store.clone(),
            contracts: store,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, MarketplaceConfig};

        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            marketplace: MarketplaceConfig {
                sample_fallback: true,
                seed_sample_listings: false,
            },
        });
        Self::with_memory_store(config)
    }
}
