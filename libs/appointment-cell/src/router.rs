use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/doctors", get(handlers::list_approved_doctors))
        .route("/", post(handlers::request_appointment))
        .route("/doctor", get(handlers::list_doctor_appointments))
        .route("/patient", get(handlers::list_patient_appointments))
        .route("/{appointment_id}/status", patch(handlers::decide_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
