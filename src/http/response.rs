//! HTTP response building module
//!
//! Status-code response builders shared by the browse path and the auxiliary
//! endpoints. Bodies are boxed so buffered pages and streamed files share one
//! response type.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use std::io;

/// Response body: either a buffered chunk or a file stream
pub type Body = UnsyncBoxBody<Bytes, io::Error>;

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Buffered body
pub fn full<T: Into<Bytes>>(chunk: T) -> Body {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Plain-text response carrying only the status line, e.g. `404 Not Found`
///
/// Used for every error so that no internal detail reaches the client.
pub fn build_status_response(status: StatusCode) -> Response<Body> {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, text.len());
    if status == StatusCode::METHOD_NOT_ALLOWED {
        builder = builder.header(header::ALLOW, ALLOWED_METHODS);
    }
    builder.body(full(text)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        fallback(status)
    })
}

/// Build 304 Not Modified response, repeating the validators
pub fn build_304_response(
    etag: &str,
    last_modified: Option<&str>,
    cache_control: &str,
) -> Response<Body> {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, cache_control);
    if let Some(date) = last_modified {
        builder = builder.header(header::LAST_MODIFIED, date);
    }
    builder.body(empty()).unwrap_or_else(|e| {
        log_build_error("304", &e);
        fallback(StatusCode::NOT_MODIFIED)
    })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<Body> {
    let text = "416 Range Not Satisfiable";
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, text.len())
        .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
        .header(header::ACCEPT_RANGES, "bytes")
        .body(full(text))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            fallback(StatusCode::RANGE_NOT_SATISFIABLE)
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ALLOW, ALLOWED_METHODS)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            fallback(StatusCode::NO_CONTENT)
        })
}

/// Build HTML response; HEAD keeps the length but drops the body
pub fn build_html_response(content: String, is_head: bool) -> Response<Body> {
    let content_length = content.len();
    let body = if is_head { empty() } else { full(content) };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build JSON response
pub fn build_json_response(
    status: StatusCode,
    value: &serde_json::Value,
    is_head: bool,
) -> Response<Body> {
    let content = value.to_string();
    let content_length = content.len();
    let body = if is_head { empty() } else { full(content) };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, "no-store")
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("JSON", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Add the permissive CORS headers media players and web frontends expect
pub fn apply_cors_headers(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Range"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Length, Content-Range, Accept-Ranges"),
    );
}

fn fallback(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!(%error, "Failed to build {status} response");
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response<Body>) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .map(http_body_util::Collected::to_bytes)
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_status_response_is_generic() {
        let response = build_status_response(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "404 Not Found");
    }

    #[test]
    fn test_405_advertises_allowed_methods() {
        let response = build_status_response(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], ALLOWED_METHODS);
    }

    #[test]
    fn test_416_carries_size() {
        let response = build_416_response(1234);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1234");
    }

    #[tokio::test]
    async fn test_html_head_has_length_but_no_body() {
        let response = build_html_response("<p>hi</p>".to_string(), true);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert_eq!(body_text(response).await, "");
    }

    #[test]
    fn test_cors_headers() {
        let mut response = build_options_response();
        apply_cors_headers(&mut response);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Range"
        );
    }
}
