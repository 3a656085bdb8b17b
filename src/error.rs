//! Request-level error taxonomy
//!
//! Every failure on the browse path ends up as one of these variants and is
//! turned into a status code with a generic body. Causes are logged by the
//! caller, never echoed to the client.

use crate::http::response::{self, Body};
use hyper::{Response, StatusCode};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("request path could not be decoded")]
    MalformedPath,

    #[error("request path escapes the served root")]
    OutsideRoot,

    #[error("no such file or directory")]
    NotFound,

    #[error("directory could not be read: {0}")]
    DirectoryUnreadable(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("listing template failed: {0}")]
    Render(#[from] minijinja::Error),

    #[error("response could not be built: {0}")]
    Response(#[from] hyper::http::Error),
}

impl ServeError {
    /// Classify a filesystem error, folding "does not exist" style failures into `NotFound`.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound,
            _ => Self::Io(err),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPath => StatusCode::BAD_REQUEST,
            Self::OutsideRoot => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DirectoryUnreadable(_) | Self::Io(_) | Self::Render(_) | Self::Response(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the failure is the server's fault rather than the client's.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    pub fn into_response(self) -> Response<Body> {
        response::build_status_response(self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServeError::MalformedPath.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServeError::OutsideRoot.status(), StatusCode::FORBIDDEN);
        assert_eq!(ServeError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServeError::Io(io::Error::other("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_io_folds_missing_paths() {
        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(ServeError::from_io(missing), ServeError::NotFound));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(ServeError::from_io(denied), ServeError::Io(_)));
    }

    #[test]
    fn test_internal_errors_are_flagged() {
        assert!(!ServeError::OutsideRoot.is_internal());
        assert!(ServeError::DirectoryUnreadable(io::Error::other("x")).is_internal());
    }
}
