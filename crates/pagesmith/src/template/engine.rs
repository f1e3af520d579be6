//! Render capability.
//!
//! This module defines the [`TemplateEngine`] trait the file transform renders
//! through. The default implementation is [`MiniJinjaEngine`], configured
//! once per run with the search paths, filters and tags.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Value};

use super::filters::FilterRegistry;
use super::scope::FilterScope;
use super::tags::TagRegistry;
use crate::context::RenderContext;
use crate::error::RenderError;

/// A template engine that renders a source string with a context.
///
/// `name` identifies the source in error messages and, for engines that
/// support inheritance, is the name relative `extends`/`include` references
/// are reported against.
pub trait TemplateEngine: Send + Sync {
    /// Renders `source` with `context`.
    fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &RenderContext,
    ) -> Result<String, RenderError>;

    /// Checks whether a template resolves on the search path.
    fn has_template(&self, name: &str) -> bool;
}

/// MiniJinja-based render capability.
///
/// The configured environment is never rendered with directly. Every
/// top-level render goes through a fresh clone, so templates loaded from the
/// search paths are re-read from disk for each file and nothing compiled
/// survives between files.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pagesmith::capability::{ComrakMarkdown, MaskFormatter};
/// use pagesmith::template::{FilterRegistry, FilterScope, MiniJinjaEngine, TagRegistry, TemplateEngine};
/// use pagesmith::{ErrorChannel, RenderContext};
///
/// let scope = Arc::new(FilterScope::new(
///     ".",
///     vec!["html".into()],
///     Arc::new(ComrakMarkdown::new()),
///     Arc::new(MaskFormatter::new()),
///     ErrorChannel::new(),
/// ));
/// let engine = MiniJinjaEngine::new(
///     vec!["templates".into()],
///     false,
///     &FilterRegistry::new(),
///     &TagRegistry::new(),
///     scope,
/// );
/// let out = engine
///     .render_source("index.html", "Hello {{ 'x' | markdown }}", &RenderContext::default())
///     .unwrap();
/// ```
pub struct MiniJinjaEngine {
    env: Environment<'static>,
    paths: Vec<PathBuf>,
    scope: Arc<FilterScope>,
}

impl MiniJinjaEngine {
    pub fn new(
        paths: Vec<PathBuf>,
        autoescape: bool,
        filters: &FilterRegistry,
        tags: &TagRegistry,
        scope: Arc<FilterScope>,
    ) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        if autoescape {
            env.set_auto_escape_callback(minijinja::default_auto_escape_callback);
        } else {
            env.set_auto_escape_callback(|_| AutoEscape::None);
        }
        env.set_loader(search_path_loader(paths.clone()));

        filters.install(&mut env, &scope);
        tags.install(&mut env);

        tracing::debug!(
            paths = ?paths,
            autoescape,
            filters = filters.len(),
            "render environment configured"
        );
        Self { env, paths, scope }
    }

    /// Search paths in resolution order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The configured environment. Rendering with it directly would cache
    /// loaded templates; use [`TemplateEngine::render_source`] instead.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        let _guard = self.scope.enter(Path::new(name))?;
        let env = self.env.clone();
        let rendered = env.render_named_str(name, source, Value::from_serialize(context))?;
        Ok(rendered)
    }

    fn has_template(&self, name: &str) -> bool {
        resolve_template(&self.paths, name).is_some()
    }
}

/// Builds a loader that looks `name` up in each of `paths` in order.
///
/// Names that are absolute or climb out of the search path with `..` never
/// resolve.
pub fn search_path_loader(
    paths: Vec<PathBuf>,
) -> impl Fn(&str) -> Result<Option<String>, minijinja::Error> + Send + Sync + 'static {
    move |name| match resolve_template(&paths, name) {
        Some(path) => fs::read_to_string(&path).map(Some).map_err(|err| {
            minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                format!("could not read template {}", path.display()),
            )
            .with_source(err)
        }),
        None => Ok(None),
    }
}

/// Lexically normalizes a template name. `None` when it is absolute or
/// climbs above the search directory.
fn normalize_name(name: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

fn resolve_template(paths: &[PathBuf], name: &str) -> Option<PathBuf> {
    let relative = normalize_name(name)?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    paths
        .iter()
        .map(|dir| dir.join(&relative))
        .find(|candidate| candidate.is_file())
}
