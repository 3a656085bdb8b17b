//! Request handler module
//!
//! Maps request paths onto the media directory and turns them into listings
//! or file streams, plus the small JSON endpoints.

pub mod api;
pub mod dispatch;
pub mod files;
pub mod listing;
pub mod render;
pub mod resolve;
pub mod router;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
