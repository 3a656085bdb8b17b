//! HTTP protocol layer module
//!
//! Protocol-level pieces of the streaming transport: range parsing, cache
//! validators, content types and response builders. Nothing in here knows
//! about the served root or directory listings.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::parse_range_header;
pub use response::{
    apply_cors_headers, build_304_response, build_416_response, build_html_response,
    build_json_response, build_options_response, build_status_response, Body,
};
