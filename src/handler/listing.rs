//! Directory listing construction
//!
//! Reads one directory level, drops hidden and unreadable entries, projects
//! the rest into display records and orders them deterministically.

use crate::error::ServeError;
use crate::http::mime;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

/// Names starting with this character are never listed.
pub const HIDDEN_PREFIX: char = '.';

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "m4a"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Display category, used for icons and CSS classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Directory,
    Video,
    Audio,
    Image,
    Other,
}

impl FileCategory {
    /// First match wins: directory, video, audio, image, then generic.
    pub fn classify(name: &str, is_dir: bool, mime_type: Option<&str>) -> Self {
        if is_dir {
            return Self::Directory;
        }

        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime_type = mime_type.unwrap_or_default();
        let matches = |extensions: &[&str], prefix: &str| {
            mime_type.starts_with(prefix) || extensions.contains(&extension.as_str())
        };

        if matches(VIDEO_EXTENSIONS, "video/") {
            Self::Video
        } else if matches(AUDIO_EXTENSIONS, "audio/") {
            Self::Audio
        } else if matches(IMAGE_EXTENSIONS, "image/") {
            Self::Image
        } else {
            Self::Other
        }
    }

    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Video => "video-file",
            Self::Audio => "audio-file",
            Self::Image => "image-file",
            Self::Other => "",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Directory => "📁",
            Self::Video => "🎬",
            Self::Audio => "🎵",
            Self::Image => "🖼️",
            Self::Other => "📄",
        }
    }
}

/// One listed directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntryRecord {
    pub name: String,
    /// Request-relative path, e.g. `/movies/clip.mp4`
    pub path: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    /// Detected content type, files only
    pub mime_type: Option<String>,
    /// Percent-escaped `path`, safe to use as a link target
    pub encoded_path: String,
    pub category: FileCategory,
}

impl DirectoryEntryRecord {
    pub fn new(
        name: String,
        parent: &str,
        is_dir: bool,
        size: u64,
        modified: Option<SystemTime>,
    ) -> Self {
        let path = join_relative(parent, &name);
        let mime_type = (!is_dir).then(|| mime::get_content_type(Path::new(&name)).to_string());
        let category = FileCategory::classify(&name, is_dir, mime_type.as_deref());
        let encoded_path = encode_link_path(&path);
        Self {
            name,
            path,
            size,
            modified,
            is_dir,
            mime_type,
            encoded_path,
            category,
        }
    }

    fn from_metadata(name: String, parent: &str, metadata: &Metadata) -> Self {
        Self::new(
            name,
            parent,
            metadata.is_dir(),
            metadata.len(),
            metadata.modified().ok(),
        )
    }
}

/// Everything the listing page needs
#[derive(Debug, Clone)]
pub struct DirectoryListingView {
    pub path: String,
    pub parent_path: Option<String>,
    pub entries: Vec<DirectoryEntryRecord>,
    pub server_name: String,
}

/// Build the listing for `directory`, which is served at `relative_path`.
///
/// Only a failure to open the directory itself is fatal. A child whose
/// metadata cannot be read is logged and skipped, and a read error part-way
/// through ends the listing with the entries gathered so far.
pub async fn build(
    directory: &Path,
    relative_path: &str,
    server_name: &str,
) -> Result<DirectoryListingView, ServeError> {
    let mut reader = fs::read_dir(directory)
        .await
        .map_err(ServeError::DirectoryUnreadable)?;

    let mut entries = Vec::new();
    while let Some(entry) = next_or_stop(reader.next_entry().await, directory) {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(directory = %directory.display(), name = ?raw, "Skipping entry with non UTF-8 name");
                continue;
            }
        };

        if is_hidden(&name) {
            continue;
        }

        // Follows symlinks, so a link to a directory is listed as one
        match fs::metadata(entry.path()).await {
            Ok(metadata) => entries.push(DirectoryEntryRecord::from_metadata(
                name,
                relative_path,
                &metadata,
            )),
            Err(error) => {
                warn!(directory = %directory.display(), %name, %error, "Skipping unreadable entry");
            }
        }
    }

    sort_entries(&mut entries);
    debug!(path = relative_path, count = entries.len(), "Directory listed");

    Ok(DirectoryListingView {
        path: relative_path.to_string(),
        parent_path: parent_path(relative_path),
        entries,
        server_name: server_name.to_string(),
    })
}

fn next_or_stop<T>(next: std::io::Result<Option<T>>, directory: &Path) -> Option<T> {
    next.unwrap_or_else(|error| {
        warn!(directory = %directory.display(), %error, "Directory read interrupted, listing partial");
        None
    })
}

pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Directories first, then case-insensitive by name.
///
/// The exact name breaks ties (`A.txt` vs `a.txt`) so the order never
/// depends on how the filesystem returned the entries.
pub fn sort_entries(entries: &mut [DirectoryEntryRecord]) {
    entries.sort_by(compare_entries);
}

fn compare_entries(a: &DirectoryEntryRecord, b: &DirectoryEntryRecord) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Lexical parent of a normalized request path; `None` at the root.
pub fn parent_path(relative_path: &str) -> Option<String> {
    if relative_path == "/" || relative_path.is_empty() {
        return None;
    }
    let trimmed = relative_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => Some("/".to_string()),
        Some(idx) => Some(trimmed[..idx].to_string()),
    }
}

pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Percent-escape every segment of a request path, keeping the `/` separators.
pub fn encode_link_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}
