//! Error types for rendering and the uniform error value.
//!
//! [`RenderError`] is the typed error used inside the crate: filters, the
//! render capability and the transform all return it. Nothing typed crosses
//! the error channel though; every failure is flattened into a
//! [`PluginError`] before it is reported.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Name reported as the stage identity on every [`PluginError`].
pub const PLUGIN_NAME: &str = "pagesmith";

/// Error type for rendering operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template syntax error or evaluation failure.
    #[error("template error: {0}")]
    Template(String),

    /// A template referenced through `extends`/`include` was not found.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Reading a referenced file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Markdown conversion failed.
    #[error("markdown error: {0}")]
    Markdown(String),

    /// Date parsing or formatting failed.
    #[error("date error: {0}")]
    Date(String),

    /// A `render` chain came back to a file that is still being rendered.
    #[error("cyclic reference: {} is already being rendered (via {})", path.display(), display_chain(chain))]
    CyclicReference { path: PathBuf, chain: Vec<PathBuf> },

    /// The file's content is a stream, which cannot be rendered.
    #[error("Streams are not supported!")]
    UnsupportedStream,

    /// A filter or function was called with unusable arguments.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A caller-supplied filter or extension failed.
    #[error("{0}")]
    Custom(String),

    /// Context data could not be converted.
    #[error("serialization error: {0}")]
    Serialization(String),
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl RenderError {
    /// Creates an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Creates an error for a caller-supplied filter or extension.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

// Keep engine errors out of the public surface.
impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        // One line: kind, detail and `(in name:line)`. The alternate form
        // appends a multi-line source excerpt.
        let message = err.to_string();
        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(message),
            ErrorKind::BadSerialization => RenderError::Serialization(message),
            _ => RenderError::Template(message),
        }
    }
}

impl From<RenderError> for minijinja::Error {
    fn from(err: RenderError) -> Self {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
    }
}

/// Which part of the stage produced a [`PluginError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginErrorKind {
    /// The top-level render of a file failed.
    Template,
    /// A filter failed; the offending expression rendered as empty.
    Filter,
    /// The input could not be processed at all and was dropped.
    UnsupportedInput,
}

/// Uniform error value reported on the error channel.
///
/// Carries only owned text so it can be logged, collected or shown to a
/// user without exposing the error type that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("[{plugin}] {message}")]
pub struct PluginError {
    /// Stage identity, always [`PLUGIN_NAME`].
    pub plugin: String,
    pub kind: PluginErrorKind,
    pub message: String,
    /// File being transformed when the error happened, if known.
    pub path: Option<PathBuf>,
}

impl PluginError {
    pub fn new(kind: PluginErrorKind, message: impl Into<String>) -> Self {
        Self {
            plugin: PLUGIN_NAME.to_string(),
            kind,
            message: message.into(),
            path: None,
        }
    }

    /// Flattens a render error into a uniform value.
    pub fn from_render(kind: PluginErrorKind, err: &RenderError) -> Self {
        Self::new(kind, err.to_string())
    }

    /// Attaches the path of the file being transformed.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
