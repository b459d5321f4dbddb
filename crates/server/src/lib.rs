//! Tracklet REST API Server Library
//!
//! Exposes issue intake, status changes and a live issue stream over HTTP so
//! that web clients can share one issue list.

pub mod routes;

// Re-export for convenience
pub use routes::{create_routes, AppState};
