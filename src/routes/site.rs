use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/health", get(|| async { "ok" }))
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub auth: &'static str,
}

const ROUTES: &[(&str, &str, &str)] = &[
    ("POST", "/auth/sign-up", "none"),
    ("POST", "/auth/sign-in", "none"),
    ("POST", "/auth/refresh", "refresh token"),
    ("POST", "/auth/sign-out", "access token"),
    ("GET", "/marketplace", "none"),
    ("GET", "/marketplace/:listing_id/proposal", "buyer"),
    ("POST", "/marketplace/:listing_id/proposals", "buyer"),
    ("POST", "/create-listing", "farmer"),
    ("GET", "/listings/:id", "none"),
    ("GET", "/dashboard", "access token"),
    ("GET", "/contracts/:id", "contract party"),
    ("POST", "/contracts/:id/:action", "contract party"),
    ("GET", "/profile", "access token"),
    ("PUT", "/profile", "access token"),
];

pub async fn index() -> Json<Value> {
    let routes: Vec<RouteInfo> = ROUTES
        .iter()
        .map(|&(method, path, auth)| RouteInfo { method, path, auth })
        .collect();
    Json(json!({
        "name": "Harvest Link",
        "tagline": "Secure pre-harvest contracts between farmers and buyers",
        "how_it_works": [
            "Farmers list upcoming harvests with quantity, minimum price and harvest date",
            "Buyers browse the marketplace and propose contracts",
            "Farmers accept or decline; buyers pay once a contract is active",
            "Farmers mark delivery to complete the contract",
        ],
        "routes": routes,
    }))
}

pub async fn about() -> Json<Value> {
    Json(json!({
        "mission": "Connect farmers directly with buyers through transparent pre-harvest contracts.",
        "for_farmers": [
            "Guaranteed market access",
            "Price stability and income security",
            "Reduced market risks and uncertainties",
        ],
        "for_buyers": [
            "Direct farmer-buyer relationships",
            "Quality assurance",
            "Consistent supply chain management",
        ],
        "payments": "Payments are simulated; no money moves.",
    }))
}
