use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    ApplicationError, ApplicationStatus, ApplicationStatusResponse, SetApplicationStatusRequest,
    SubmitApplicationRequest,
};
use crate::services::application::ApplicationService;

fn map_error(e: ApplicationError) -> AppError {
    match e {
        ApplicationError::NotFound => AppError::NotFound("Application not found".to_string()),
        ApplicationError::ValidationError(msg) => AppError::ValidationError(msg),
        ApplicationError::InvalidStatus(msg) => AppError::BadRequest(msg),
        ApplicationError::UploadError(msg) => AppError::ExternalService(msg),
        ApplicationError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = ApplicationService::new(&state);
    let application = service
        .submit(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "application": application,
        "message": "Application submitted successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "admin")?;

    let service = ApplicationService::new(&state);
    let applications = service.list(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({ "applications": applications })))
}

#[axum::debug_handler]
pub async fn set_application_status(
    State(state): State<Arc<AppConfig>>,
    Path(id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetApplicationStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "admin")?;

    let service = ApplicationService::new(&state);
    let application = service
        .set_status(&id, request.status, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "application": application
    })))
}

#[axum::debug_handler]
pub async fn reapply(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = ApplicationService::new(&state);
    let application = service.reapply(&user, auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "application": application,
        "message": "Previous application cleared; submit a fresh one"
    })))
}

/// A doctor with no record yet reads as pending, matching what the
/// application form shows before first submission.
#[axum::debug_handler]
pub async fn application_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApplicationStatusResponse>, AppError> {
    require_role(&user, "doctor")?;

    let service = ApplicationService::new(&state);
    let application = service.get_own(&user, auth.token()).await.map_err(map_error)?;

    let response = match application {
        Some(app) => ApplicationStatusResponse {
            status: app.status,
            submitted: true,
        },
        None => ApplicationStatusResponse {
            status: ApplicationStatus::Pending,
            submitted: false,
        },
    };

    Ok(Json(response))
}
