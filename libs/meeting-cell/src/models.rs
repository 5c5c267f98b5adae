use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled video consultation. `time` keeps the raw HH:MM form the
/// doctor entered; `scheduled_time` is the canonical instant computed
/// from it and is what every rule checks against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub room_id: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub doctor_email: String,
    pub patient_email: String,
    pub date: NaiveDate,
    pub time: String,
    pub scheduled_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeetingRequest {
    pub room_id: String,
    pub doctor_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleMeetingRequest {
    pub date: NaiveDate,
    pub time: String,
}

/// Signed access to the conferencing room, handed out once the join gate
/// opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRoomAccess {
    pub room_id: String,
    pub join_url: String,
    pub room_token: String,
}

/// Outcome of the join gate. Too-early is a normal answer, not an error:
/// the caller is told how long to wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum JoinDecision {
    TooEarly {
        scheduled_time: DateTime<Utc>,
        wait_seconds: i64,
    },
    Proceed {
        meeting: Meeting,
        access: VideoRoomAccess,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MeetingError {
    #[error("Meeting not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid meeting time: {0}")]
    InvalidTime(String),

    #[error("Room ID already exists: {0}")]
    RoomIdTaken(String),

    #[error("Meeting times should be at least 10 minutes apart")]
    SpacingViolation,

    #[error("Not authorized to act on this meeting")]
    Unauthorized,

    #[error("Video conferencing is not configured")]
    VideoNotConfigured,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
