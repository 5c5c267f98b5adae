use serde::{Deserialize, Serialize};

/// Roles a visitor may choose at signup. Admin accounts are provisioned
/// out of band; the role of an account never changes afterwards.
pub const SIGNUP_ROLES: [&str; 2] = ["patient", "doctor"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}
