//! Health and info endpoints

use crate::config::AppState;
use crate::http::{self, Body};
use chrono::Local;
use hyper::{Response, StatusCode};
use serde_json::json;
use tokio::fs;
use tracing::warn;

/// `GET /health`: 200 while the media directory is reachable, 503 otherwise
pub async fn health(state: &AppState, is_head: bool) -> Response<Body> {
    let reachable = match fs::metadata(state.root.path()).await {
        Ok(metadata) => metadata.is_dir(),
        Err(error) => {
            warn!(directory = %state.root.path().display(), %error, "Health check failed");
            false
        }
    };

    if reachable {
        http::build_json_response(
            StatusCode::OK,
            &json!({
                "status": "healthy",
                "timestamp": Local::now().to_rfc3339(),
                "media_directory": state.config.media.directory,
            }),
            is_head,
        )
    } else {
        http::build_json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({
                "status": "unhealthy",
                "error": "media directory not accessible",
            }),
            is_head,
        )
    }
}

/// `GET /api/info`
pub fn info(state: &AppState, is_head: bool) -> Response<Body> {
    http::build_json_response(
        StatusCode::OK,
        &json!({
            "name": state.config.media.server_name,
            "version": env!("CARGO_PKG_VERSION"),
            "media_directory": state.config.media.directory,
            "server_time": Local::now().to_rfc3339(),
            "endpoints": {
                "health": "/health",
                "api_info": "/api/info",
                "browse": "/",
            },
        }),
        is_head,
    )
}
