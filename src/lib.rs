//! Static HTTP media server
//!
//! Exposes one local directory tree over HTTP: directories are rendered as
//! navigable listings, files are streamed with range and cache support so
//! media players can seek.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::{AppState, Config, ConfigLoadError};
pub use error::ServeError;
