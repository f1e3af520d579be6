//! # Pagesmith - Template Rendering for Content Pipelines
//!
//! Pagesmith is the render stage of a static-content build: it takes content
//! files with attached front matter, renders the HTML ones through
//! Jinja-style templates, and hands every file back to the pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesmith::{ContentFile, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::new().with_path("templates"));
//! let file = ContentFile::from_path("content/index.html").unwrap();
//! let out = pipeline.process(file);
//! for error in &out.errors {
//!     eprintln!("{error}");
//! }
//! ```
//!
//! ## What gets rendered
//!
//! A file is rendered only when its extension is HTML-like and it carries
//! metadata. When the metadata names a `template`, the body is placed in
//! that template's `content` block:
//!
//! ```text
//! ---
//! template: layout.html
//! title: Home
//! ---
//! <p>Welcome to {{ global.site }}</p>
//! ```
//!
//! Everything else passes through untouched.
//!
//! ## Render context
//!
//! Each file renders with its metadata plus `filename`, `published`,
//! `updated`, `stats` and `global` (the run's variables). See
//! [`RenderContext`].
//!
//! ## Filters
//!
//! `attributes`, `body`, `render`, `markdown` and `date` read other content
//! files and format values. A failing filter reports on the run's
//! [`ErrorChannel`] and renders as empty; see [`template::FilterRegistry`].
//!
//! ## Crates
//!
//! - `pagesmith-matter`: front-matter splitting
//! - `pagesmith`: this crate
//! - `pagesmith-cli`: command-line runner

pub mod capability;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod template;
pub mod transform;
pub mod wrapper;

pub use pagesmith_matter::{split, split_bytes, Attributes, FrontMatter};

pub use config::{has_fail_flag, trailing_args, ConfigError, PipelineConfig, Settings, FAIL_FLAG};
pub use context::RenderContext;
pub use diagnostics::ErrorChannel;
pub use error::{PluginError, PluginErrorKind, RenderError, PLUGIN_NAME};
pub use file::{ContentFile, Contents, FileStat, Metadata};
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use template::{Extension, FilterRegistry, FunctionTag, TagRegistry, TemplateEngine};
pub use transform::{FileTransform, TransformStatus, Transformed};
pub use wrapper::{wrap, CONTENT_BLOCK};

// Re-export minijinja::Value so caller filters don't need a direct dependency.
pub use minijinja::Value;
