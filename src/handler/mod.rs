//! Request handler module
//!
//! Responsible for request routing dispatch and the API route handlers.

pub mod router;
pub mod routes;
pub mod types;

// Re-export main entry point
pub use router::handle_request;
