// Configuration module entry point
// Loads config.toml, validates it, and builds the shared application state

mod state;
mod types;

use crate::handler::resolve::ServedRoot;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, MediaConfig, PerformanceConfig, ServerConfig};

const ENV_PREFIX: &str = "MEDIA";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Startup failures; any of these aborts the process
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid listen address {addr}: {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to serialize default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("media directory {} is not usable: {source}", path.display())]
    MediaDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("listing template failed to compile: {0}")]
    Template(#[from] minijinja::Error),
}

impl Config {
    /// Load configuration from the given file, then `MEDIA_*` environment
    /// variables (`MEDIA_SERVER__PORT=9000`), then built-in defaults.
    /// A missing file is not an error.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigLoadError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("media.directory", "./media")?
            .set_default("media.server_name", "HTTP Media Server")?
            .set_default("media.follow_symlinks", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 0)?
            .set_default("http.enable_cors", true)?
            .set_default("http.enable_api", true)?
            .set_default("http.cache_max_age", 3600)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigLoadError::Invalid("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid(
                "server.port must be between 1 and 65535".into(),
            ));
        }
        if self.server.workers == Some(0) {
            return Err(ConfigLoadError::Invalid(
                "server.workers must be at least 1".into(),
            ));
        }
        if self.media.directory.trim().is_empty() {
            return Err(ConfigLoadError::Invalid(
                "media.directory must not be empty".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigLoadError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ConfigLoadError::Address { addr, source })
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: impl AsRef<Path>) -> Result<(), ConfigLoadError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content).map_err(|source| ConfigLoadError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create the media directory if needed and canonicalize it
    pub fn served_root(&self) -> Result<ServedRoot, ConfigLoadError> {
        let path = PathBuf::from(&self.media.directory);
        let media_error = |source| ConfigLoadError::MediaDirectory {
            path: path.clone(),
            source,
        };

        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(media_error)?;
            tracing::info!(directory = %path.display(), "Created media directory");
        }
        // Must be listable, not merely present
        std::fs::read_dir(&path).map_err(media_error)?;
        ServedRoot::new(&path).map_err(media_error)
    }
}
