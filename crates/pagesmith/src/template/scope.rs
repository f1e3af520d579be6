//! Run-scoped state shared by the built-in filters.
//!
//! A [`FilterScope`] is built once per run from the configuration and handed
//! to the filters and the engine explicitly. Everything in it is read-only
//! after construction except the error channel and the render stack, which
//! have their own interior locking.

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use pagesmith_matter::FrontMatter;

use crate::capability::{DateFormatter, MarkdownConverter};
use crate::diagnostics::ErrorChannel;
use crate::error::RenderError;
use crate::file::is_html_path;

/// State the built-in filters need: where to resolve paths, which
/// capabilities to call, and where to report failures.
pub struct FilterScope {
    root: PathBuf,
    html_extensions: Vec<String>,
    markdown: Arc<dyn MarkdownConverter>,
    dates: Arc<dyn DateFormatter>,
    errors: ErrorChannel,
    stack: RenderStack,
}

impl FilterScope {
    pub fn new(
        root: impl Into<PathBuf>,
        html_extensions: Vec<String>,
        markdown: Arc<dyn MarkdownConverter>,
        dates: Arc<dyn DateFormatter>,
        errors: ErrorChannel,
    ) -> Self {
        Self {
            root: root.into(),
            html_extensions,
            markdown,
            dates,
            errors,
            stack: RenderStack::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn markdown(&self) -> &dyn MarkdownConverter {
        self.markdown.as_ref()
    }

    pub fn dates(&self) -> &dyn DateFormatter {
        self.dates.as_ref()
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn is_html(&self, path: &Path) -> bool {
        is_html_path(path, &self.html_extensions)
    }

    /// Resolves a template-supplied path against the run root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        normalize(&self.root.join(path))
    }

    /// Reads a file relative to the root and splits its front matter.
    ///
    /// Nothing is cached: the file is read fresh on every call.
    pub fn read_matter(&self, path: &str) -> Result<FrontMatter, RenderError> {
        let full = self.resolve(path);
        let raw = std::fs::read(&full).map_err(|e| RenderError::io(path, e))?;
        Ok(pagesmith_matter::split_bytes(&raw))
    }

    /// Marks `path` as being rendered until the returned guard drops.
    ///
    /// Fails with [`RenderError::CyclicReference`] when the path is already
    /// on the stack.
    pub fn enter(&self, path: &Path) -> Result<StackGuard<'_>, RenderError> {
        let key = normalize(&self.root.join(path));
        self.stack.push(key)?;
        Ok(StackGuard { stack: &self.stack })
    }

    /// The top-level file currently being rendered, if any.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.stack.bottom()
    }
}

#[derive(Debug, Default)]
struct RenderStack {
    paths: Mutex<Vec<PathBuf>>,
}

impl RenderStack {
    fn push(&self, key: PathBuf) -> Result<(), RenderError> {
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        if paths.contains(&key) {
            return Err(RenderError::CyclicReference {
                path: key,
                chain: paths.clone(),
            });
        }
        paths.push(key);
        Ok(())
    }

    fn pop(&self) {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).pop();
    }

    fn bottom(&self) -> Option<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .first()
            .cloned()
    }
}

/// Pops its path off the render stack when dropped.
pub struct StackGuard<'a> {
    stack: &'a RenderStack,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

/// Lexically normalizes a path, folding `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ComrakMarkdown, MaskFormatter};

    fn scope(root: &Path) -> FilterScope {
        FilterScope::new(
            root,
            vec!["html".to_string()],
            Arc::new(ComrakMarkdown::new()),
            Arc::new(MaskFormatter::new()),
            ErrorChannel::new(),
        )
    }

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_enter_detects_cycles() {
        let scope = scope(Path::new("/site"));
        let outer = scope.enter(Path::new("index.html")).unwrap();
        let inner = scope.enter(Path::new("posts/a.md")).unwrap();

        let err = scope.enter(Path::new("./index.html")).err().unwrap();
        match err {
            RenderError::CyclicReference { path, chain } => {
                assert_eq!(path, PathBuf::from("/site/index.html"));
                assert_eq!(chain.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        drop(inner);
        drop(outer);
        assert!(scope.enter(Path::new("index.html")).is_ok());
    }

    #[test]
    fn test_current_file_is_bottom_of_stack() {
        let scope = scope(Path::new("/site"));
        assert_eq!(scope.current_file(), None);
        let _outer = scope.enter(Path::new("index.html")).unwrap();
        let _inner = scope.enter(Path::new("b.md")).unwrap();
        assert_eq!(scope.current_file(), Some(PathBuf::from("/site/index.html")));
    }

    #[test]
    fn test_absolute_paths_ignore_root() {
        let scope = scope(Path::new("/site"));
        assert_eq!(scope.resolve("/abs/file.md"), PathBuf::from("/abs/file.md"));
        assert_eq!(scope.resolve("posts/a.md"), PathBuf::from("/site/posts/a.md"));
    }

    #[test]
    fn test_read_matter_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let scope = scope(dir.path());
        let err = scope.read_matter("nope.md").unwrap_err();
        assert!(err.to_string().contains("nope.md"));
    }
}
