use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    AppointmentDecisionRequest, AppointmentError, AppointmentMode, AppointmentStatus,
    RequestAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

fn map_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::InvalidDecision(msg) => AppError::BadRequest(msg),
        AppointmentError::AlreadyDecided(status) => {
            AppError::Conflict(format!("Appointment already {}", status))
        }
        AppointmentError::Unauthorized => {
            AppError::Forbidden("Not authorized to act on this appointment".to_string())
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_approved_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let doctors = service
        .list_approved_doctors(auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "doctors": doctors })))
}

#[axum::debug_handler]
pub async fn request_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RequestAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "patient")?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .request_appointment(&user, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested; wait for the doctor's approval"
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_for_doctor(&user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "patient")?;

    let service = AppointmentBookingService::new(&state);
    let appointments = service
        .list_for_patient(&user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn decide_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentDecisionRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "doctor")?;

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .decide(&user, appointment_id, request, auth.token())
        .await
        .map_err(map_error)?;

    // An approved online appointment is the entry point for scheduling
    // the video meeting.
    let can_schedule_meeting = appointment.status == AppointmentStatus::Approved
        && appointment.mode == AppointmentMode::Online;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "can_schedule_meeting": can_schedule_meeting
    })))
}
