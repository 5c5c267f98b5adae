use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{CreateMeetingRequest, MeetingError, RescheduleMeetingRequest};
use crate::services::expiry::ExpirySweeper;
use crate::services::scheduler::MeetingSchedulerService;

fn map_error(e: MeetingError) -> AppError {
    match e {
        MeetingError::NotFound => AppError::NotFound("Meeting not found".to_string()),
        MeetingError::ValidationError(msg) => AppError::ValidationError(msg),
        MeetingError::InvalidTime(msg) => AppError::BadRequest(msg),
        MeetingError::RoomIdTaken(room) => AppError::Conflict(format!(
            "Room ID '{}' already exists. Please choose a different Room ID",
            room
        )),
        MeetingError::SpacingViolation => AppError::Conflict(
            "Meeting times should be at least 10 minutes apart".to_string(),
        ),
        MeetingError::Unauthorized => {
            AppError::Forbidden("Not authorized to act on this meeting".to_string())
        }
        MeetingError::VideoNotConfigured => {
            AppError::ExternalService("Video conferencing is not configured".to_string())
        }
        MeetingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_meetings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = MeetingSchedulerService::new(&state);
    let meetings = service
        .list_for_principal(&user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "meetings": meetings })))
}

#[axum::debug_handler]
pub async fn create_meeting(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMeetingRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = MeetingSchedulerService::new(&state);
    let meeting = service
        .create(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "meeting": meeting,
        "message": "Meeting scheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_meeting(
    State(state): State<Arc<AppConfig>>,
    Path(meeting_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleMeetingRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = MeetingSchedulerService::new(&state);
    let meeting = service
        .reschedule(&user, meeting_id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "meeting": meeting
    })))
}

#[axum::debug_handler]
pub async fn join_meeting(
    State(state): State<Arc<AppConfig>>,
    Path(room_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = MeetingSchedulerService::new(&state);
    let decision = service
        .join(&user, &room_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(decision)))
}

#[axum::debug_handler]
pub async fn get_meeting_by_room(
    State(state): State<Arc<AppConfig>>,
    Path(room_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = MeetingSchedulerService::new(&state);
    let meeting = service
        .get_by_room(&user, &room_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "meeting": meeting })))
}

/// Manual sweep for operators; the background task does the same work on
/// its own clock.
#[axum::debug_handler]
pub async fn cleanup_expired_meetings(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "admin")?;

    let sweeper = ExpirySweeper::new(&state);
    let removed = sweeper
        .sweep_once(Utc::now())
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}
