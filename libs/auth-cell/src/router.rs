use std::sync::Arc;

use axum::{
    Router,
    routing::post,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/reset-password", post(handlers::reset_password))
        .route("/validate", post(handlers::validate_token))
        .route("/verify", post(handlers::verify_token))
        .with_state(state)
}
