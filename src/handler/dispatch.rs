//! Response dispatch
//!
//! Takes a raw request path through resolution and decides between a
//! directory listing and a streamed file.

use crate::config::AppState;
use crate::error::ServeError;
use crate::handler::files;
use crate::handler::listing;
use crate::handler::resolve::{resolve, ResolvedPath, ServedRoot};
use crate::handler::router::RequestContext;
use crate::http::{self, Body};
use hyper::{Response, StatusCode};
use std::error::Error as _;
use tokio::fs;
use tracing::{debug, error, warn};

/// Serve `raw_path` from the media tree; failures become generic status pages
pub async fn browse(raw_path: &str, ctx: &RequestContext, state: &AppState) -> Response<Body> {
    let result = match resolve(raw_path, &state.root) {
        Ok(resolved) => dispatch(&resolved, ctx, state).await,
        Err(err) => Err(err),
    };

    result.unwrap_or_else(|err| {
        log_failure(raw_path, &err);
        err.into_response()
    })
}

pub async fn dispatch(
    resolved: &ResolvedPath,
    ctx: &RequestContext,
    state: &AppState,
) -> Result<Response<Body>, ServeError> {
    if !state.config.media.follow_symlinks {
        ensure_target_contained(resolved, &state.root).await?;
    }

    let metadata = fs::metadata(resolved.absolute())
        .await
        .map_err(ServeError::from_io)?;

    if metadata.is_dir() {
        let view = listing::build(
            resolved.absolute(),
            resolved.relative(),
            &state.config.media.server_name,
        )
        .await?;
        let html = state.renderer.render(&view)?;
        Ok(http::build_html_response(html, ctx.is_head))
    } else if metadata.is_file() {
        files::serve_file(resolved.absolute(), &metadata, ctx, state.cache_policy()).await
    } else {
        // Sockets, FIFOs and devices are not media
        Err(ServeError::NotFound)
    }
}

/// Symlinks may not lead out of the served root
async fn ensure_target_contained(
    resolved: &ResolvedPath,
    root: &ServedRoot,
) -> Result<(), ServeError> {
    let target = fs::canonicalize(resolved.absolute())
        .await
        .map_err(ServeError::from_io)?;
    if root.contains(&target) {
        Ok(())
    } else {
        Err(ServeError::OutsideRoot)
    }
}

fn log_failure(raw_path: &str, err: &ServeError) {
    match err.status() {
        StatusCode::NOT_FOUND => debug!(path = raw_path, "Not found"),
        status if err.is_internal() => match err.source() {
            Some(cause) => error!(path = raw_path, %status, %cause, "{err}"),
            None => error!(path = raw_path, %status, "{err}"),
        },
        status => warn!(path = raw_path, %status, "Rejected request: {err}"),
    }
}
