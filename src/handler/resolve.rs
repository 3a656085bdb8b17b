//! Request path resolution
//!
//! Turns the raw, percent-encoded request path into a filesystem path that
//! is guaranteed to sit inside the served root. Resolution is purely
//! lexical: it never touches the filesystem, so the same input always gives
//! the same answer.

use crate::error::ServeError;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The configured media directory, canonical and absolute.
#[derive(Debug, Clone)]
pub struct ServedRoot {
    path: PathBuf,
}

impl ServedRoot {
    /// Canonicalize `path`, which must name an existing directory.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = std::fs::canonicalize(path)?;
        if !path.is_dir() {
            return Err(io::Error::other(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Component-wise containment: `/data` contains `/data/x` but not `/data-other`.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }
}

/// A request path that passed decoding, normalization and containment.
///
/// Only [`resolve`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Normalized request path, always starting with `/`.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative == "/"
    }
}

/// Resolve a raw request path against the served root.
///
/// ```
/// use media_serve::handler::resolve::{resolve, ServedRoot};
///
/// let root = ServedRoot::new(std::env::temp_dir()).unwrap();
/// let resolved = resolve("/a/../b%20c/", &root).unwrap();
/// assert_eq!(resolved.relative(), "/b c");
/// assert!(resolved.absolute().starts_with(root.path()));
/// ```
pub fn resolve(raw_path: &str, root: &ServedRoot) -> Result<ResolvedPath, ServeError> {
    let decoded = decode_path(raw_path)?;
    let relative = normalize_path(&decoded).ok_or(ServeError::OutsideRoot)?;

    let mut absolute = root.path.clone();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        absolute.push(plain_component(segment)?);
    }

    if !root.contains(&absolute) {
        return Err(ServeError::OutsideRoot);
    }

    Ok(ResolvedPath { absolute, relative })
}

/// Percent-decode a request path exactly once.
///
/// Every `%` must start a two-digit hex escape, the result must be UTF-8 and
/// may not contain NUL. `+` stays a literal plus.
pub fn decode_path(raw: &str) -> Result<String, ServeError> {
    let bytes = raw.as_bytes();
    let escapes_valid = raw.match_indices('%').all(|(i, _)| {
        bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !escapes_valid {
        return Err(ServeError::MalformedPath);
    }

    let decoded = urlencoding::decode(raw).map_err(|_| ServeError::MalformedPath)?;
    if decoded.contains('\0') {
        return Err(ServeError::MalformedPath);
    }
    Ok(decoded.into_owned())
}

/// Lexically normalize a decoded path into `/seg/seg` form.
///
/// Empty and `.` segments vanish and `..` drops the previous segment.
/// Returns `None` when a `..` would climb above the root.
pub fn normalize_path(decoded: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// A segment must map to exactly one ordinary path component on this
/// platform; drive prefixes, roots and native separators are refused.
fn plain_component(segment: &str) -> Result<&OsStr, ServeError> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == OsStr::new(segment) => Ok(name),
        _ => Err(ServeError::OutsideRoot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn served_root() -> (TempDir, ServedRoot) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = ServedRoot::new(dir.path()).expect("root");
        (dir, root)
    }

    #[test]
    fn test_root_variants_resolve_to_root() {
        let (_dir, root) = served_root();
        for raw in ["", "/", "//", "/.", "/./.", "/a/..", "/a/%2e%2e"] {
            let resolved = resolve(raw, &root).expect(raw);
            assert_eq!(resolved.relative(), "/", "raw path {raw:?}");
            assert_eq!(resolved.absolute(), root.path());
            assert!(resolved.is_root());
        }
    }

    #[test]
    fn test_nested_path() {
        let (_dir, root) = served_root();
        let resolved = resolve("/movies/2024/clip.mp4", &root).expect("resolve");
        assert_eq!(resolved.relative(), "/movies/2024/clip.mp4");
        assert_eq!(
            resolved.absolute(),
            root.path().join("movies").join("2024").join("clip.mp4")
        );
    }

    #[test]
    fn test_parent_escape_is_rejected() {
        let (_dir, root) = served_root();
        assert!(matches!(
            resolve("/../../etc/passwd", &root),
            Err(ServeError::OutsideRoot)
        ));
    }

    #[test]
    fn test_traversal_never_escapes() {
        let (_dir, root) = served_root();
        let attempts = [
            "/../../etc/passwd",
            "/..%2f..%2fetc%2fpasswd",
            "/%2e%2e/%2e%2e/etc/passwd",
            "/a/b/../../../../etc/passwd",
            "//etc/passwd",
            "/%2Fetc%2Fpasswd",
            "/./../.././etc//passwd",
            "/..",
            "..",
        ];
        for raw in attempts {
            match resolve(raw, &root) {
                Ok(resolved) => {
                    assert!(
                        resolved.absolute().starts_with(root.path()),
                        "{raw} escaped to {}",
                        resolved.absolute().display()
                    );
                    assert_eq!(resolved.relative(), "/etc/passwd");
                }
                Err(err) => assert!(matches!(err, ServeError::OutsideRoot), "{raw}: {err}"),
            }
        }
    }

    #[test]
    fn test_malformed_escapes() {
        let (_dir, root) = served_root();
        for raw in ["/%", "/%4", "/%zz", "/a%g1", "/%ff%fe", "/a%00b"] {
            assert!(
                matches!(resolve(raw, &root), Err(ServeError::MalformedPath)),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn test_decoding_is_single_pass() {
        assert_eq!(decode_path("/a%2520b").ok().as_deref(), Some("/a%20b"));
        assert_eq!(decode_path("/a+b").ok().as_deref(), Some("/a+b"));
        assert_eq!(
            decode_path("/%E6%97%A5%E6%9C%AC").ok().as_deref(),
            Some("/日本")
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (_dir, root) = served_root();
        for raw in ["/a/./b/../c", "/x%20y", "/z/.."] {
            assert_eq!(
                resolve(raw, &root).expect(raw),
                resolve(raw, &root).expect(raw)
            );
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("").as_deref(), Some("/"));
        assert_eq!(normalize_path("a//b/").as_deref(), Some("/a/b"));
        assert_eq!(normalize_path("/a/./b/..").as_deref(), Some("/a"));
        assert_eq!(normalize_path("/a/..").as_deref(), Some("/"));
        assert_eq!(normalize_path("/..."), Some("/...".to_string()));
        assert_eq!(normalize_path("/../a"), None);
        assert_eq!(normalize_path("/a/../.."), None);
    }

    #[test]
    fn test_containment_is_component_wise() {
        let root = ServedRoot {
            path: PathBuf::from("/data"),
        };
        assert!(root.contains(Path::new("/data")));
        assert!(root.contains(Path::new("/data/movies")));
        assert!(!root.contains(Path::new("/data-other")));
        assert!(!root.contains(Path::new("/data2/movies")));
        assert!(!root.contains(Path::new("/")));
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_prefixes_rejected() {
        let (_dir, root) = served_root();
        assert!(matches!(
            resolve("/C:/Windows", &root),
            Err(ServeError::OutsideRoot)
        ));
        assert!(matches!(
            resolve("/a%5C..%5C..%5Cb", &root),
            Err(ServeError::OutsideRoot)
        ));
    }

    #[test]
    fn test_served_root_must_be_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").expect("write");
        assert!(ServedRoot::new(&file).is_err());
        assert!(ServedRoot::new(dir.path().join("missing")).is_err());
    }
}
