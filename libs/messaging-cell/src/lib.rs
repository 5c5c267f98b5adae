//! Contact-form messages: authenticated submission, admin inbox with a
//! role filter, admin deletion.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ContactMessage, MessageFilter};
pub use router::message_routes;
