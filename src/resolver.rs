//! Request path resolution
//!
//! Maps the raw path of a request onto a file below the served root.
//! [`normalize`] is pure and does the traversal guarding; [`ResourceResolver`]
//! adds the filesystem lookups (index files, symlink checks, readability).

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

/// Index file served for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Why a raw path could not be turned into segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeError {
    /// A `..` segment would walk above the root
    Escape,
    /// A segment contains a byte no file name can hold
    Invalid,
}

/// A file that exists below the root and can be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
    /// Lower-cased extension, if any
    pub extension: Option<String>,
}

/// Outcome of resolving one request path
#[derive(Debug)]
pub enum Resolution {
    Found(ResolvedFile),
    NotFound,
    Forbidden,
    /// Filesystem failure other than "not found"
    ServerError(io::Error),
}

/// Remove the query string and fragment from a raw request target
pub fn strip_query(raw_path: &str) -> &str {
    raw_path
        .split_once(|c| c == '?' || c == '#')
        .map_or(raw_path, |(path, _)| path)
}

/// Lower-cased extension of the last segment of a request path
///
/// Used to pick a cache class when nothing was resolved.
pub fn nominal_extension(raw_path: &str) -> Option<String> {
    let path = strip_query(raw_path);
    let last = path.rsplit('/').next().unwrap_or(path);
    extension_of(Path::new(last))
}

/// Split, decode and collapse a request path into root-relative segments
///
/// # Examples
/// ```
/// use asset_server::resolver::{normalize, NormalizeError};
///
/// assert_eq!(normalize("/a/./b/../c.css?v=1").unwrap(), vec!["a", "c.css"]);
/// assert_eq!(normalize("/%2e%2e/etc/passwd"), Err(NormalizeError::Escape));
/// ```
pub fn normalize(raw_path: &str) -> Result<Vec<String>, NormalizeError> {
    let mut segments: Vec<String> = Vec::new();

    for raw_segment in strip_query(raw_path).split('/') {
        let decoded = percent_decode(raw_segment)?;
        // An encoded slash separates segments just like a literal one
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(NormalizeError::Escape);
                    }
                }
                s if s.contains('\0') => return Err(NormalizeError::Invalid),
                s => segments.push(s.to_string()),
            }
        }
    }

    Ok(segments)
}

/// Decode `%XX` escapes; malformed escapes are kept as-is
///
/// Escapes that decode to invalid UTF-8 name no file we could serve.
fn percent_decode(input: &str) -> Result<String, NormalizeError> {
    let bytes = input.as_bytes();
    if !bytes.contains(&b'%') {
        return Ok(input.to_string());
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).map_err(|_| NormalizeError::Invalid)
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Lookup failures that only mean "no such resource" for a client
fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            // a path walking through a regular file
            | io::ErrorKind::NotADirectory
            // a segment longer than the filesystem allows
            | io::ErrorKind::InvalidFilename
    )
}

/// Resolves request paths against a fixed root directory
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    root: PathBuf,
}

impl ResourceResolver {
    /// `root` must already be canonical; `ServerConfig` guarantees it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a raw request path to a servable file
    pub async fn resolve(&self, raw_path: &str) -> Resolution {
        let segments = match normalize(raw_path) {
            Ok(segments) => segments,
            Err(NormalizeError::Escape) => return Resolution::Forbidden,
            Err(NormalizeError::Invalid) => return Resolution::NotFound,
        };

        let mut target = self.root.clone();
        target.extend(&segments);

        match self.locate(target).await {
            Ok(resolution) => resolution,
            Err(e) if is_not_found(&e) => Resolution::NotFound,
            Err(e) => Resolution::ServerError(e),
        }
    }

    async fn locate(&self, mut target: PathBuf) -> io::Result<Resolution> {
        let mut metadata = fs::metadata(&target).await?;
        if metadata.is_dir() {
            target.push(INDEX_FILE);
            metadata = fs::metadata(&target).await?;
        }
        if !metadata.is_file() {
            return Ok(Resolution::NotFound);
        }

        // Symlinks below the root may still point outside of it
        let canonical = fs::canonicalize(&target).await?;
        if !canonical.starts_with(&self.root) {
            return Ok(Resolution::Forbidden);
        }

        // Opening proves readability; the handler reopens to stream
        drop(fs::File::open(&canonical).await?);

        Ok(Resolution::Found(ResolvedFile {
            extension: extension_of(&canonical),
            size: metadata.len(),
            path: canonical,
        }))
    }
}
