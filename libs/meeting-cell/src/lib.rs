//! Video meeting scheduling.
//!
//! The rules live in `services::conflict` and are enforced at create and
//! reschedule time, never retroactively: a room id is unique among the
//! doctor's non-expired meetings, and two meetings under the same check
//! scope stay at least ten minutes apart. A meeting older than its grace
//! window is deleted by the background sweep in `services::expiry`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{JoinDecision, Meeting, MeetingError, VideoRoomAccess};
pub use router::meeting_routes;
pub use services::expiry::run_expiry_sweeper;
