use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{MessageFilter, MessagingError, SubmitMessageRequest};
use crate::services::messages::MessagingService;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub filter: Option<MessageFilter>,
}

fn map_error(e: MessagingError) -> AppError {
    match e {
        MessagingError::ValidationError(msg) => AppError::ValidationError(msg),
        MessagingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn submit_message(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MessagingService::new(&state);
    let message = service
        .submit(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<ListMessagesQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "admin")?;

    let service = MessagingService::new(&state);
    let messages = service
        .list(query.filter.unwrap_or_default(), auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "messages": messages })))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<Arc<AppConfig>>,
    Path(message_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "admin")?;

    let service = MessagingService::new(&state);
    service
        .delete(message_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "success": true })))
}
