use serde::{Deserialize, Serialize};

use crate::profiles::repo_types::{Role, UserProfile};

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after sign-up, sign-in or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub profile: UserProfile,
}
