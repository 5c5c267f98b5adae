//! Doctor credential applications: submission with license image upload,
//! admin review, and the rejected-then-reapply loop.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ApplicationStatus, DoctorApplication};
pub use router::application_routes;
