//! HTTP cache control module
//!
//! Validators (`ETag`, `Last-Modified`) derived from file metadata, and the
//! conditional request checks that use them.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Generate an `ETag` from file size and modification time
///
/// Same scheme as nginx: `"<mtime hex>-<size hex>"`. Content is never read,
/// so large media files cost nothing to tag.
pub fn generate_etag(size: u64, modified: Option<SystemTime>) -> String {
    let mtime = modified.map_or(0, unix_seconds);
    format!("\"{mtime:x}-{size:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Uses weak comparison, so `W/"x"` matches `"x"`. Supports lists and `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let etag = strip_weak(etag);
    if_none_match.is_some_and(|client_etags| {
        client_etags
            .split(',')
            .map(str::trim)
            .any(|e| e == "*" || strip_weak(e) == etag)
    })
}

/// `If-Modified-Since`: true when the file has not changed since the given date
pub fn is_not_modified(if_modified_since: Option<&str>, modified: Option<SystemTime>) -> bool {
    let (Some(since), Some(modified)) = (if_modified_since.and_then(parse_http_date), modified)
    else {
        return false;
    };
    unix_seconds(modified) <= unix_seconds_of(since)
}

/// `If-Unmodified-Since`: true when the file changed after the given date (412)
pub fn is_precondition_failed(
    if_unmodified_since: Option<&str>,
    modified: Option<SystemTime>,
) -> bool {
    let (Some(since), Some(modified)) = (if_unmodified_since.and_then(parse_http_date), modified)
    else {
        return false;
    };
    unix_seconds(modified) > unix_seconds_of(since)
}

/// `If-Range`: whether a Range header may be honoured
///
/// The validator is either an entity tag (strong comparison) or a date
/// (must equal the current modification time). Anything stale means the
/// client gets the full, current body instead.
pub fn if_range_allows(if_range: Option<&str>, etag: &str, modified: Option<SystemTime>) -> bool {
    let Some(validator) = if_range.map(str::trim) else {
        return true;
    };

    if validator.starts_with('"') || validator.starts_with("W/") {
        return !validator.starts_with("W/") && validator == etag;
    }

    match (parse_http_date(validator), modified) {
        (Some(date), Some(modified)) => unix_seconds(modified) == unix_seconds_of(date),
        _ => false,
    }
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse any of the three HTTP date formats
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    // RFC 850 and asctime; asctime pads single-digit days with a space
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %d %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&collapsed, format).ok())
        .map(|naive| naive.and_utc())
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

fn unix_seconds_of(date: DateTime<Utc>) -> i64 {
    date.timestamp()
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Revalidate on every use
    NoCache,
}

impl CachePolicy {
    /// `max_age == 0` disables caching rather than advertising a zero lifetime.
    pub const fn from_max_age(max_age: u32) -> Self {
        if max_age == 0 {
            Self::NoCache
        } else {
            Self::Public(max_age)
        }
    }

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Public(3600) // 1 hour
    }
}
