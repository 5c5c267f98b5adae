use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use application_cell::models::DoctorApplication;

/// A patient's booking request against an approved doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_email: String,
    pub doctor_id: String,
    pub patient_name: String,
    pub patient_age: i32,
    pub patient_place: String,
    pub mode: AppointmentMode,
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub status: AppointmentStatus,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// The instant this appointment is booked for.
    pub fn scheduled_instant(&self) -> DateTime<Utc> {
        self.date.and_time(self.time.to_naive_time()).and_utc()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentMode {
    Online,
    Offline,
}

/// The bookable slots. Requests carry the wire form ("09:00" … "17:00");
/// anything outside the enumeration fails deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeSlot {
    #[serde(rename = "09:00")]
    NineAm,
    #[serde(rename = "10:00")]
    TenAm,
    #[serde(rename = "11:00")]
    ElevenAm,
    #[serde(rename = "12:00")]
    TwelvePm,
    #[serde(rename = "13:00")]
    OnePm,
    #[serde(rename = "14:00")]
    TwoPm,
    #[serde(rename = "15:00")]
    ThreePm,
    #[serde(rename = "16:00")]
    FourPm,
    #[serde(rename = "17:00")]
    FivePm,
}

impl TimeSlot {
    pub fn hour(&self) -> u32 {
        match self {
            TimeSlot::NineAm => 9,
            TimeSlot::TenAm => 10,
            TimeSlot::ElevenAm => 11,
            TimeSlot::TwelvePm => 12,
            TimeSlot::OnePm => 13,
            TimeSlot::TwoPm => 14,
            TimeSlot::ThreePm => 15,
            TimeSlot::FourPm => 16,
            TimeSlot::FivePm => 17,
        }
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), 0, 0)
            .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.hour())
    }
}

/// Coordinates captured from the approving doctor's device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAppointmentRequest {
    pub doctor_id: String,
    pub patient_name: String,
    pub patient_age: i32,
    pub patient_place: String,
    pub mode: AppointmentMode,
    pub date: NaiveDate,
    pub time: TimeSlot,
}

/// The doctor's decision on a pending appointment. Coordinates are
/// optional input: device geolocation may be denied or never resolve,
/// and the status write must not wait on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDecisionRequest {
    pub status: AppointmentStatus,
    pub location: Option<GeoPoint>,
}

/// An approved application merged with the account profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedDoctor {
    #[serde(flatten)]
    pub application: DoctorApplication,
    pub account: serde_json::Value,
}

/// Patient-facing listing entry: the appointment plus the doctor's name
/// resolved from the application record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithDoctor {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_name: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment already decided: {0}")]
    AlreadyDecided(AppointmentStatus),

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Not authorized to act on this appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
