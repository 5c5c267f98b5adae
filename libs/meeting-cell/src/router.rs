use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn meeting_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_meetings))
        .route("/", post(handlers::create_meeting))
        .route("/{meeting_id}/reschedule", patch(handlers::reschedule_meeting))
        .route("/room/{room_id}", get(handlers::get_meeting_by_room))
        .route("/room/{room_id}/join", post(handlers::join_meeting))
        .route("/admin/cleanup", post(handlers::cleanup_expired_meetings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
