use serde::{Deserialize, Serialize};
use std::fmt;

/// Image content types the license upload accepts.
pub const ALLOWED_LICENSE_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// A doctor's credential application. Keyed by the doctor's account id:
/// re-submitting overwrites the previous record wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorApplication {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub experience: i32,
    pub license_number: String,
    pub license_image_url: String,
    pub living_place: String,
    pub languages: Vec<String>,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "pending"),
            ApplicationStatus::Approved => write!(f, "approved"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplicationRequest {
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub experience: i32,
    pub license_number: String,
    pub living_place: String,
    pub languages: Vec<String>,
    pub license_image: LicenseImage,
}

/// License image payload. `data` is base64, with or without a
/// `data:image/...;base64,` prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseImage {
    pub content_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationStatusResponse {
    pub status: ApplicationStatus,
    pub submitted: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApplicationError {
    #[error("Application not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("License upload failed: {0}")]
    UploadError(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
