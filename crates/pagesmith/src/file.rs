//! In-memory representation of content files flowing through a run.
//!
//! A [`ContentFile`] is created by the enclosing pipeline, passes through
//! the transform once, and is handed back with its contents possibly
//! replaced. Its identity is its path.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RenderError;

/// Metadata attached to a file by an upstream stage (usually its front matter).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Extensions treated as HTML when none are configured.
pub const DEFAULT_HTML_EXTENSIONS: &[&str] = &["html", "htm"];

/// Lowercases extensions and strips a leading dot, so `.HTML` and `html` match.
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Returns true when the path's extension is one of `extensions`
/// (already normalized).
pub fn is_html_path(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.iter().any(|x| *x == e))
}

/// Payload of a content file.
pub enum Contents {
    /// No payload (directories, placeholders).
    Null,
    /// Fully buffered bytes.
    Buffer(Vec<u8>),
    /// A non-seekable stream. Never rendered.
    Stream(Box<dyn Read + Send>),
}

impl Contents {
    /// Returns true for `Null` and for an empty buffer.
    pub fn is_empty(&self) -> bool {
        match self {
            Contents::Null => true,
            Contents::Buffer(bytes) => bytes.is_empty(),
            Contents::Stream(_) => false,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Contents::Stream(_))
    }

    /// Returns the buffered bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => f.write_str("Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Contents::Buffer(bytes)
    }
}

impl From<String> for Contents {
    fn from(text: String) -> Self {
        Contents::Buffer(text.into_bytes())
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Contents::Buffer(text.as_bytes().to_vec())
    }
}

/// Filesystem timestamps and size of a content file.
///
/// Exposed to templates as `stats`; timestamps serialize as RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStat {
    /// Creation time. Falls back to `mtime` where the platform has none.
    pub birthtime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub atime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub size: u64,
}

impl FileStat {
    /// A stat record with every timestamp set to `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            birthtime: at,
            mtime: at,
            atime: at,
            ctime: at,
            size: 0,
        }
    }

    /// Builds a stat record from filesystem metadata.
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        let mtime = meta.modified().map(to_utc).unwrap_or_else(|_| Utc::now());
        Self {
            birthtime: meta.created().map(to_utc).unwrap_or(mtime),
            mtime,
            atime: meta.accessed().map(to_utc).unwrap_or(mtime),
            // std has no portable change time; modification time is the closest.
            ctime: mtime,
            size: meta.len(),
        }
    }

    pub fn with_birthtime(mut self, at: DateTime<Utc>) -> Self {
        self.birthtime = at;
        self
    }

    pub fn with_mtime(mut self, at: DateTime<Utc>) -> Self {
        self.mtime = at;
        self
    }
}

impl Default for FileStat {
    fn default() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH)
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// A content file moving through the pipeline.
#[derive(Debug)]
pub struct ContentFile {
    pub path: PathBuf,
    pub contents: Contents,
    pub stat: FileStat,
    /// Attached metadata. Only files carrying metadata are rendered.
    pub meta: Option<Metadata>,
}

impl ContentFile {
    /// Creates a buffered file with default stat and no metadata.
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Contents>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            stat: FileStat::default(),
            meta: None,
        }
    }

    /// Reads a file from disk the way an upstream front-matter stage would:
    /// the metadata block becomes `meta` and the body becomes the contents.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| RenderError::io(path, e))?;
        let stat = fs::metadata(path)
            .map(|m| FileStat::from_metadata(&m))
            .map_err(|e| RenderError::io(path, e))?;
        let matter = pagesmith_matter::split_bytes(&raw);

        Ok(Self {
            path: path.to_path_buf(),
            contents: Contents::Buffer(matter.body.into_bytes()),
            stat,
            meta: Some(matter.attributes),
        })
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_stat(mut self, stat: FileStat) -> Self {
        self.stat = stat;
        self
    }

    /// File extension without the dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Buffered contents as text, if the file is buffered.
    pub fn text(&self) -> Option<String> {
        self.contents
            .as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}
