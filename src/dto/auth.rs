use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    /// `buyer` (default) or `shop` for supplier accounts.
    pub role: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ConfirmEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PasswordResetConfirmRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

/// Partial profile update; absent fields keep their current value.
#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ChangeRoleRequest {
    /// Current password, re-verified before the switch.
    pub password: String,
    /// `buyer` or `shop`.
    pub role: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
