// Application state module
// Everything a request needs, built once at startup and shared read-only

use super::types::Config;
use super::ConfigLoadError;
use crate::handler::render::ListingRenderer;
use crate::handler::resolve::ServedRoot;
use crate::http::cache::CachePolicy;

/// Application state
pub struct AppState {
    pub config: Config,
    pub root: ServedRoot,
    pub renderer: ListingRenderer,
}

impl AppState {
    /// Prepare the media directory and compile the listing template
    pub fn new(config: Config) -> Result<Self, ConfigLoadError> {
        let root = config.served_root()?;
        let renderer = ListingRenderer::new()?;
        Ok(Self {
            config,
            root,
            renderer,
        })
    }

    pub const fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_max_age(self.config.http.cache_max_age)
    }
}
