use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use application_cell::router::application_routes;
use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use meeting_cell::router::meeting_routes;
use messaging_cell::router::message_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Telehealth Portal API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/applications", application_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/meetings", meeting_routes(state.clone()))
        .nest("/messages", message_routes(state.clone()))
}
