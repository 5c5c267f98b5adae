use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn message_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::submit_message))
        .route("/", get(handlers::list_messages))
        .route("/{message_id}", delete(handlers::delete_message))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
