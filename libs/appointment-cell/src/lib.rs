//! Patient booking requests and doctor decisions. Approving an offline
//! appointment attaches the doctor's device coordinates when they are
//! available; the approval itself never waits on them.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentMode, AppointmentStatus, GeoPoint, TimeSlot};
pub use router::appointment_routes;
