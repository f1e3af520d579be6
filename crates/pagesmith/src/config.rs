//! Run configuration.
//!
//! [`PipelineConfig`] is the programmatic builder and owns everything a run
//! needs. [`Settings`] is the serializable subset that can be loaded from a
//! YAML file and then extended in code with filters, tags and capabilities.
//!
//! ```yaml
//! paths: [templates, partials]
//! failOnError: true
//! autoescape: false
//! htmlExtensions: [html, htm]
//! variables:
//!   site: Example
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::Value as TemplateValue;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::capability::{
    ComrakMarkdown, DateFormatter, MarkdownConverter, MarkdownOptions, MaskFormatter,
};
use crate::error::RenderError;
use crate::file::{normalize_extensions, DEFAULT_HTML_EXTENSIONS};
use crate::template::{Extension, FilterRegistry, TagRegistry};

/// Trailing command-line flag that turns on `fail_on_error`.
pub const FAIL_FLAG: &str = "--fail";

/// Error loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings could not be parsed.
    #[error("invalid settings{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
}

/// Returns true when `args` contain the `--fail` flag.
pub fn has_fail_flag<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().any(|a| a.as_ref() == FAIL_FLAG)
}

/// The flags after the program and task names of a full argument vector.
///
/// A build tool invokes a task as `tool <task> [flags...]`, so only what
/// follows the task name is a flag for this stage.
pub fn trailing_args<I>(argv: I) -> impl Iterator<Item = I::Item>
where
    I: IntoIterator,
{
    argv.into_iter().skip(2)
}

/// Serializable run settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Template search directories, first match wins.
    pub paths: Vec<PathBuf>,
    /// Exposed to every render as `global`.
    pub variables: Map<String, Value>,
    #[serde(alias = "fail_on_error")]
    pub fail_on_error: bool,
    #[serde(alias = "html_extensions")]
    pub html_extensions: Vec<String>,
    pub autoescape: bool,
    /// Directory filter paths resolve against. Defaults to the working
    /// directory.
    pub root: Option<PathBuf>,
    pub markdown: MarkdownOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            variables: Map::new(),
            fail_on_error: false,
            html_extensions: DEFAULT_HTML_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            autoescape: false,
            root: None,
            markdown: MarkdownOptions::default(),
        }
    }
}

impl Settings {
    /// Parses settings from YAML. An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        parse_yaml(yaml, None)
    }

    /// Loads settings from a YAML file.
    ///
    /// Relative `paths` and `root` are resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = parse_yaml(&text, Some(path))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        settings.paths = settings.paths.iter().map(|p| base.join(p)).collect();
        settings.root = settings.root.map(|r| base.join(r));
        Ok(settings)
    }

    /// Settings defaults with the trailing flags of `argv` applied.
    ///
    /// `argv` is a full argument vector, program name first. See
    /// [`trailing_args`].
    pub fn from_args<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::default();
        settings.apply_args(trailing_args(argv));
        settings
    }

    /// [`Settings::from_args`] over the current process arguments.
    pub fn from_process_args() -> Self {
        Self::from_args(std::env::args())
    }

    /// Applies recognised trailing flags. Currently only `--fail`.
    pub fn apply_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if has_fail_flag(args) {
            self.fail_on_error = true;
        }
        self
    }

    /// Builds a run configuration from these settings.
    pub fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_paths(self.paths)
            .with_variables(self.variables)
            .fail_on_error(self.fail_on_error)
            .with_html_extensions(self.html_extensions)
            .with_autoescape(self.autoescape)
            .with_markdown(ComrakMarkdown::with_options(self.markdown));
        if let Some(root) = self.root {
            config = config.with_root(root);
        }
        config
    }
}

fn parse_yaml(yaml: &str, path: Option<&Path>) -> Result<Settings, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: path.map(Path::to_path_buf),
        message: e.to_string(),
    })
}

/// Everything one run is configured with.
///
/// ```rust
/// use pagesmith::PipelineConfig;
/// use serde_json::json;
///
/// let config = PipelineConfig::new()
///     .with_path("templates")
///     .with_variable("site", json!("Example"))
///     .with_filter("shout", |args| {
///         Ok(args[0].as_str().unwrap_or_default().to_uppercase().into())
///     })
///     .fail_on_error(true);
/// assert!(config.is_fail_on_error());
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    paths: Vec<PathBuf>,
    filters: FilterRegistry,
    tags: TagRegistry,
    variables: Map<String, Value>,
    fail_on_error: bool,
    html_extensions: Vec<String>,
    autoescape: bool,
    root: PathBuf,
    markdown: Arc<dyn MarkdownConverter>,
    dates: Arc<dyn DateFormatter>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Defaults: no search paths, built-in filters only, HTML extensions
    /// `html`/`htm`, autoescape off, root at the working directory.
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            filters: FilterRegistry::new(),
            tags: TagRegistry::new(),
            variables: Map::new(),
            fail_on_error: false,
            html_extensions: normalize_extensions(DEFAULT_HTML_EXTENSIONS),
            autoescape: false,
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            markdown: Arc::new(ComrakMarkdown::new()),
            dates: Arc::new(MaskFormatter::new()),
        }
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Registers a filter. A name already taken, built-in or not, is
    /// replaced.
    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&[TemplateValue]) -> Result<TemplateValue, RenderError> + Send + Sync + 'static,
    {
        self.filters.insert(name, filter);
        self
    }

    /// Merges a prepared registry; its entries win.
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters.merge(filters);
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, extension: impl Extension + 'static) -> Self {
        self.tags.insert(name, extension);
        self
    }

    pub fn with_tags(mut self, tags: TagRegistry) -> Self {
        self.tags.merge(tags);
        self
    }

    /// Replaces the global variables.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    /// Applies trailing process flags (`--fail`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if has_fail_flag(args) {
            self.fail_on_error = true;
        }
        self
    }

    pub fn with_html_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.html_extensions = normalize_extensions(extensions);
        self
    }

    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_markdown(mut self, markdown: impl MarkdownConverter + 'static) -> Self {
        self.markdown = Arc::new(markdown);
        self
    }

    pub fn with_dates(mut self, dates: impl DateFormatter + 'static) -> Self {
        self.dates = Arc::new(dates);
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn is_fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    pub fn html_extensions(&self) -> &[String] {
        &self.html_extensions
    }

    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn markdown(&self) -> Arc<dyn MarkdownConverter> {
        Arc::clone(&self.markdown)
    }

    pub(crate) fn dates(&self) -> Arc<dyn DateFormatter> {
        Arc::clone(&self.dates)
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("paths", &self.paths)
            .field("filters", &self.filters)
            .field("tags", &self.tags)
            .field("variables", &self.variables)
            .field("fail_on_error", &self.fail_on_error)
            .field("html_extensions", &self.html_extensions)
            .field("autoescape", &self.autoescape)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl From<Settings> for PipelineConfig {
    fn from(settings: Settings) -> Self {
        settings.into_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_camel_case() {
        let settings = Settings::from_yaml(
            "paths: [templates]\nfailOnError: true\nhtmlExtensions: [html, xhtml]\nvariables:\n  site: Example\n",
        )
        .unwrap();
        assert_eq!(settings.paths, vec![PathBuf::from("templates")]);
        assert!(settings.fail_on_error);
        assert_eq!(settings.html_extensions, vec!["html", "xhtml"]);
        assert_eq!(settings.variables["site"], "Example");
        assert!(!settings.autoescape);
    }

    #[test]
    fn test_settings_snake_case_alias() {
        let settings = Settings::from_yaml("fail_on_error: true").unwrap();
        assert!(settings.fail_on_error);
    }

    #[test]
    fn test_empty_settings_are_defaults() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
        assert_eq!(Settings::default().html_extensions, vec!["html", "htm"]);
    }

    #[test]
    fn test_settings_parse_error() {
        let err = Settings::from_yaml("paths: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
        assert!(err.to_string().starts_with("invalid settings: "));
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pagesmith.yaml");
        std::fs::write(&file, "paths: [templates]\nroot: content\n").unwrap();

        let settings = Settings::from_file(&file).unwrap();
        assert_eq!(settings.paths, vec![dir.path().join("templates")]);
        assert_eq!(settings.root, Some(dir.path().join("content")));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Settings::from_file("/no/such/settings.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_fail_flag() {
        assert!(has_fail_flag(["build", "--fail"]));
        assert!(!has_fail_flag(["build", "--failure"]));

        let mut settings = Settings::default();
        settings.apply_args(["--verbose"]);
        assert!(!settings.fail_on_error);
        settings.apply_args(["--verbose", "--fail"]);
        assert!(settings.fail_on_error);
    }

    #[test]
    fn test_trailing_args_skip_program_and_task() {
        let rest: Vec<_> = trailing_args(["tool", "build", "--fail", "-v"]).collect();
        assert_eq!(rest, vec!["--fail", "-v"]);
        assert_eq!(trailing_args(["tool"]).count(), 0);
    }

    #[test]
    fn test_from_args_reads_flags_after_task() {
        assert!(!Settings::from_args(["prog", "--fail"]).fail_on_error);
        assert!(Settings::from_args(["prog", "build", "--fail"]).fail_on_error);
        assert!(!Settings::from_args(["prog", "build"]).fail_on_error);
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_path("a")
            .with_paths(["b", "c"])
            .with_variable("site", json!("Example"))
            .with_html_extensions([".HTML"])
            .with_args(["--fail"]);
        assert_eq!(
            config.paths(),
            &[PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert_eq!(config.variables()["site"], "Example");
        assert_eq!(config.html_extensions(), &["html".to_string()]);
        assert!(config.is_fail_on_error());
        assert_eq!(config.filters().len(), 5);
    }

    #[test]
    fn test_settings_into_config() {
        let settings = Settings {
            root: Some(PathBuf::from("/site")),
            autoescape: true,
            ..Settings::default()
        };
        let config = PipelineConfig::from(settings);
        assert_eq!(config.root(), Path::new("/site"));
        assert!(config.autoescape());
        assert_eq!(config.html_extensions(), &["html".to_string(), "htm".to_string()]);
    }
}
