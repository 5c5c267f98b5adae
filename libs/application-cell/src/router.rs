use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn application_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::submit_application))
        .route("/", get(handlers::list_applications))
        .route("/status", get(handlers::application_status))
        .route("/reapply", post(handlers::reapply))
        .route("/{id}/status", patch(handlers::set_application_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
