use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contact-form submission. The role is recorded from the submitting
/// principal so admins can slice the inbox by audience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub role: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMessageRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFilter {
    #[default]
    All,
    Patient,
    Doctor,
}

impl MessageFilter {
    pub fn matches(&self, role: &str) -> bool {
        match self {
            MessageFilter::All => true,
            MessageFilter::Patient => role == "patient",
            MessageFilter::Doctor => role == "doctor",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MessagingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
