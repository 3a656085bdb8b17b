//! MIME type detection module
//!
//! Extension-based content type lookup backed by `mime_guess`, with the
//! generic binary fallback when the extension is unknown or missing.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get the Content-Type for a path from its extension
///
/// # Examples
/// ```
/// use media_serve::http::mime::get_content_type;
/// assert_eq!(get_content_type("movie.mp4".as_ref()), "video/mp4");
/// assert_eq!(get_content_type("README".as_ref()), "application/octet-stream");
/// ```
pub fn get_content_type(path: &Path) -> &'static str {
    mime_guess::from_path(path).first_raw().unwrap_or(OCTET_STREAM)
}
