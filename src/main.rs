use time::OffsetDateTime;

mod app;
mod auth;
mod config;
mod contracts;
mod error;
mod listings;
mod memory;
mod profiles;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use crate::{listings::services::seed_sample_listings, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "harvest_link=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if app_state.config.marketplace.seed_sample_listings {
        match seed_sample_listings(app_state.listings.as_ref(), OffsetDateTime::now_utc()).await {
            Ok(0) => tracing::debug!("listing store not empty; skipping seed"),
            Ok(n) => tracing::info!(listings = n, "seeded sample listings"),
            Err(e) => tracing::warn!(error = %e, "seeding sample listings failed; continuing"),
        }
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
