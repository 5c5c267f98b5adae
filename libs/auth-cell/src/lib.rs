//! Identity gate: account creation with role assignment, session
//! operations proxied to the identity provider, and local token
//! validation for the other cells.

pub mod handlers;
pub mod models;
pub mod router;

pub use router::auth_routes;
