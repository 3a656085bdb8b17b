//! Listing page rendering
//!
//! The template is compiled once at startup; auto-escaping is on because the
//! template name ends in `.html`, so entry names cannot inject markup.

use crate::handler::listing::{encode_link_path, DirectoryEntryRecord, DirectoryListingView};
use chrono::{DateTime, Local};
use minijinja::{context, Environment};
use serde::Serialize;

const LISTING_TEMPLATE_NAME: &str = "listing.html";
const LISTING_TEMPLATE: &str = include_str!("../../templates/listing.html");

const BYTES_PER_MB: f64 = 1_048_576.0;

pub struct ListingRenderer {
    env: Environment<'static>,
}

#[derive(Serialize)]
struct EntryContext<'a> {
    name: &'a str,
    href: &'a str,
    class: &'static str,
    icon: &'static str,
    is_dir: bool,
    mime_type: Option<&'a str>,
    size_mb: String,
    modified: Option<String>,
}

impl<'a> From<&'a DirectoryEntryRecord> for EntryContext<'a> {
    fn from(entry: &'a DirectoryEntryRecord) -> Self {
        Self {
            name: &entry.name,
            href: &entry.encoded_path,
            class: entry.category.css_class(),
            icon: entry.category.icon(),
            is_dir: entry.is_dir,
            mime_type: entry.mime_type.as_deref(),
            size_mb: format_size_mb(entry.size),
            modified: entry
                .modified
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl ListingRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(LISTING_TEMPLATE_NAME, LISTING_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &DirectoryListingView) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(LISTING_TEMPLATE_NAME)?;
        let entries: Vec<EntryContext<'_>> = view.entries.iter().map(EntryContext::from).collect();
        template.render(context! {
            server_name => view.server_name,
            path => view.path,
            parent_href => view.parent_path.as_deref().map(encode_link_path),
            entries => entries,
        })
    }
}

/// Size in MiB with two decimals, e.g. `1.50`
#[allow(clippy::cast_precision_loss)]
pub fn format_size_mb(size: u64) -> String {
    format!("{:.2}", size as f64 / BYTES_PER_MB)
}
