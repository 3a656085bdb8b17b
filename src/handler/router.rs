//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, the auxiliary
//! JSON endpoints, media browsing, CORS and access logging.

use crate::config::AppState;
use crate::handler::{api, dispatch};
use crate::http::{self, Body};
use crate::logger::{self, AccessLogEntry};
use hyper::header::{self, HeaderMap, HeaderName};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

const HEALTH_PATH: &str = "/health";
const API_INFO_PATH: &str = "/api/info";

/// Request headers the file and listing paths care about
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_unmodified_since: Option<String>,
    pub if_range: Option<String>,
    pub range_header: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let headers = req.headers();
        Self {
            is_head: req.method() == Method::HEAD,
            if_none_match: header_string(headers, &header::IF_NONE_MATCH),
            if_modified_since: header_string(headers, &header::IF_MODIFIED_SINCE),
            if_unmodified_since: header_string(headers, &header::IF_UNMODIFIED_SINCE),
            if_range: header_string(headers, &header::IF_RANGE),
            range_header: header_string(headers, &header::RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Never fails: every problem becomes a status code.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<Response<Body>, Infallible> {
    let started = Instant::now();
    let ctx = RequestContext::from_request(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = route_request(&method, &path, &ctx, &state).await;

    if state.config.http.enable_cors {
        http::apply_cors_headers(&mut response);
    }

    if state.config.logging.access_log {
        let entry = access_entry(&req, peer_addr, &response, ctx.is_head, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request(
    method: &Method,
    path: &str,
    ctx: &RequestContext,
    state: &AppState,
) -> Response<Body> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(method) {
        return resp;
    }

    // 2. Auxiliary endpoints, when enabled they shadow same-named media paths
    if state.config.http.enable_api {
        match path {
            HEALTH_PATH => return api::health(state, ctx.is_head).await,
            API_INFO_PATH => return api::info(state, ctx.is_head),
            _ => {}
        }
    }

    // 3. Everything else is the media tree
    dispatch::browse(path, ctx, state).await
}

/// Only GET and HEAD reach the media tree; OPTIONS answers for CORS preflight
fn check_http_method(method: &Method) -> Option<Response<Body>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            warn!(%method, "Method not allowed");
            Some(http::build_status_response(StatusCode::METHOD_NOT_ALLOWED))
        }
    }
}

fn access_entry<B>(
    req: &Request<B>,
    peer_addr: Option<SocketAddr>,
    response: &Response<Body>,
    is_head: bool,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.map(|addr| addr.ip().to_string()),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    // HEAD and 304 advertise a length they never send
    entry.body_bytes = if is_head || response.status() == StatusCode::NOT_MODIFIED {
        0
    } else {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    entry.referer = header_string(req.headers(), &header::REFERER);
    entry.user_agent = header_string(req.headers(), &header::USER_AGENT);
    entry.elapsed = started.elapsed();
    entry
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
