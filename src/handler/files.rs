//! File streaming
//!
//! Serves one regular file with validators, conditional requests and single
//! byte ranges. The body is read from disk in chunks as the client consumes
//! it, so a multi-gigabyte video costs one buffer of memory per connection.

use crate::error::ServeError;
use crate::handler::router::RequestContext;
use crate::http::cache::{self, CachePolicy};
use crate::http::range::RangeParseResult;
use crate::http::response::{self, Body};
use crate::http::{mime, parse_range_header};
use futures::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Read buffer per streamed response
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Serve `path`, whose metadata the caller already fetched.
///
/// The file is opened before any validator is evaluated, so a file that
/// exists but cannot be read is reported as an error even for `HEAD`.
pub async fn serve_file(
    path: &Path,
    metadata: &Metadata,
    ctx: &RequestContext,
    cache_policy: CachePolicy,
) -> Result<Response<Body>, ServeError> {
    let file = File::open(path).await.map_err(ServeError::from_io)?;

    let size = metadata.len();
    let modified = metadata.modified().ok();
    let etag = cache::generate_etag(size, modified);
    let last_modified = modified.map(cache::format_http_date);
    let cache_control = cache_policy.to_header_value();

    if cache::is_precondition_failed(ctx.if_unmodified_since.as_deref(), modified) {
        return Ok(response::build_status_response(
            StatusCode::PRECONDITION_FAILED,
        ));
    }

    // If-None-Match takes precedence; If-Modified-Since only counts without it
    let not_modified = if ctx.if_none_match.is_some() {
        cache::check_etag_match(ctx.if_none_match.as_deref(), &etag)
    } else {
        cache::is_not_modified(ctx.if_modified_since.as_deref(), modified)
    };
    if not_modified {
        return Ok(response::build_304_response(
            &etag,
            last_modified.as_deref(),
            &cache_control,
        ));
    }

    let range_header = if cache::if_range_allows(ctx.if_range.as_deref(), &etag, modified) {
        ctx.range_header.as_deref()
    } else {
        None
    };

    let range = match parse_range_header(range_header, size) {
        RangeParseResult::Valid(range) => Some(range),
        RangeParseResult::NotSatisfiable => {
            debug!(path = %path.display(), range = ?range_header, size, "Range not satisfiable");
            return Ok(response::build_416_response(size));
        }
        RangeParseResult::None => None,
    };

    let (status, start, length) = match range {
        Some(range) => (StatusCode::PARTIAL_CONTENT, range.start, range.len()),
        None => (StatusCode::OK, 0, size),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime::get_content_type(path))
        .header(header::CONTENT_LENGTH, length)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, cache_control)
        .header(header::ETAG, etag)
        .header(header::CONTENT_DISPOSITION, content_disposition(path));
    if let Some(date) = last_modified {
        builder = builder.header(header::LAST_MODIFIED, date);
    }
    if let Some(range) = range {
        builder = builder.header(header::CONTENT_RANGE, range.content_range(size));
    }

    let body = if ctx.is_head {
        response::empty()
    } else {
        stream_body(file, start, length).await?
    };

    Ok(builder.body(body)?)
}

/// Stream `length` bytes of `file` starting at `start`
async fn stream_body(mut file: File, start: u64, length: u64) -> Result<Body, ServeError> {
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    let stream = ReaderStream::with_capacity(file.take(length), STREAM_BUFFER_SIZE);
    Ok(StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync())
}

/// `inline; filename="..."` so browsers play media in place
///
/// Control characters are dropped and `"`/`\` escaped; a name that still
/// cannot be a header value falls back to a bare `inline`.
fn content_disposition(path: &Path) -> HeaderValue {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return HeaderValue::from_static("inline");
    };

    let mut escaped = String::with_capacity(name.len());
    for c in name.chars().filter(|c| !c.is_control()) {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    HeaderValue::from_bytes(format!("inline; filename=\"{escaped}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}
