use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt::validate_token as validate_jwt;

use crate::models::{LoginRequest, ResetPasswordRequest, SignupRequest, SIGNUP_ROLES};

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !pattern.is_match(email) {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }
    Ok(())
}

/// Create an account and persist its role. The role row is written with
/// the service credential because the new account has no session yet.
pub async fn signup(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<Value>, AppError> {
    validate_email(&request.email)?;

    if request.password.len() < 6 {
        return Err(AppError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if !SIGNUP_ROLES.contains(&request.role.as_str()) {
        return Err(AppError::ValidationError(format!(
            "Role must be one of: {}",
            SIGNUP_ROLES.join(", ")
        )));
    }

    let client = SupabaseClient::new(&config);

    let signup_body = json!({
        "email": request.email,
        "password": request.password,
        "data": { "role": request.role }
    });

    let created: Value = client
        .request(Method::POST, "/auth/v1/signup", None, Some(signup_body))
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    // GoTrue answers with the bare user object, or wraps it when a
    // session is issued alongside.
    let user_id = created["id"]
        .as_str()
        .or_else(|| created["user"]["id"].as_str())
        .ok_or_else(|| {
            AppError::ExternalService("Identity provider returned no user id".to_string())
        })?
        .to_string();

    let _rows: Vec<Value> = client
        .upsert_returning(
            "/rest/v1/users",
            Some(config.supabase_service_role_key.as_str()),
            json!([{ "id": user_id, "role": request.role }]),
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!("Account created for {} with role {}", request.email, request.role);

    Ok(Json(json!({
        "success": true,
        "user_id": user_id,
        "role": request.role,
        "message": "Account created successfully"
    })))
}

/// Password-grant token exchange; the provider session payload is
/// returned to the caller unchanged.
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    validate_email(&request.email)?;

    let client = SupabaseClient::new(&config);

    let session: Value = client
        .request(
            Method::POST,
            "/auth/v1/token?grant_type=password",
            None,
            Some(json!({
                "email": request.email,
                "password": request.password
            })),
        )
        .await
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(session))
}

pub async fn logout(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = extract_bearer_token(&headers)?;

    let client = SupabaseClient::new(&config);
    client
        .request_no_content(Method::POST, "/auth/v1/logout", Some(token.as_str()), None)
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}

pub async fn reset_password(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    validate_email(&request.email)?;

    let client = SupabaseClient::new(&config);
    client
        .request_no_content(
            Method::POST,
            "/auth/v1/recover",
            None,
            Some(json!({ "email": request.email })),
        )
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset email sent"
    })))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match validate_jwt(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;

    match validate_jwt(&token, &config.supabase_jwt_secret) {
        Ok(_) => Ok(Json(json!({ "valid": true }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}
