// Configuration types module
// Defines the sections of config.toml

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Listen address and runtime size
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads (CPU cores if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

/// The served directory tree
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    pub directory: String,
    /// Title shown on listing pages
    pub server_name: String,
    /// Serve symlink targets that resolve outside the directory
    #[serde(default = "default_follow_symlinks")]
    pub follow_symlinks: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_follow_symlinks() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration, timeouts in seconds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Time allowed for a request head to arrive
    pub read_timeout: u64,
    /// Upper bound on a whole connection, 0 disables it
    pub write_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub enable_cors: bool,
    /// Serve `/health` and `/api/info`
    pub enable_api: bool,
    /// `Cache-Control` max-age for files, 0 sends `no-cache`
    pub cache_max_age: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: None,
            },
            media: MediaConfig {
                directory: "./media".to_string(),
                server_name: "HTTP Media Server".to_string(),
                follow_symlinks: default_follow_symlinks(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                access_log_format: default_access_log_format(),
            },
            performance: PerformanceConfig {
                keep_alive: true,
                read_timeout: 30,
                write_timeout: 0,
                max_connections: None,
            },
            http: HttpConfig {
                enable_cors: true,
                enable_api: true,
                cache_max_age: 3600,
            },
        }
    }
}
