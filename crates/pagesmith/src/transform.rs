//! Per-file transform.
//!
//! Decides whether a file is rendered, renders it through the configured
//! [`TemplateEngine`], and collects whatever the error channel received
//! while doing so.

use serde_json::{Map, Value};

use crate::context::RenderContext;
use crate::diagnostics::ErrorChannel;
use crate::error::{PluginError, PluginErrorKind, RenderError};
use crate::file::{is_html_path, ContentFile, Contents};
use crate::template::TemplateEngine;
use crate::wrapper::wrap;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    /// Contents were replaced with rendered output.
    Rendered,
    /// The file was not eligible and is unchanged.
    PassedThrough,
    /// The top-level render failed; contents are unchanged.
    Failed,
    /// The file could not be processed at all and was removed.
    Dropped,
}

/// Result of transforming one file.
#[derive(Debug)]
pub struct Transformed {
    /// The file to hand downstream. `None` when it was dropped.
    pub file: Option<ContentFile>,
    pub status: TransformStatus,
    /// Errors reported while transforming this file, in report order.
    pub errors: Vec<PluginError>,
}

impl Transformed {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Renders eligible files and passes everything else through.
pub struct FileTransform<E> {
    engine: E,
    globals: Map<String, Value>,
    html_extensions: Vec<String>,
    errors: ErrorChannel,
}

impl<E: TemplateEngine> FileTransform<E> {
    pub fn new(
        engine: E,
        globals: Map<String, Value>,
        html_extensions: Vec<String>,
        errors: ErrorChannel,
    ) -> Self {
        Self {
            engine,
            globals,
            html_extensions,
            errors,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Transforms one file.
    ///
    /// Never fails: render failures are reported on the error channel and
    /// returned in [`Transformed::errors`].
    pub fn apply(&self, mut file: ContentFile) -> Transformed {
        let span = tracing::debug_span!("transform", path = %file.path.display());
        let _enter = span.enter();

        let status = self.render_into(&mut file);

        // Every error drained here happened while this file rendered.
        let mut errors = self.errors.drain();
        for error in &mut errors {
            error.path = Some(file.path.clone());
        }

        let file = match status {
            TransformStatus::Dropped => None,
            _ => Some(file),
        };
        Transformed {
            file,
            status,
            errors,
        }
    }

    fn render_into(&self, file: &mut ContentFile) -> TransformStatus {
        if file.contents.is_stream() {
            let err = RenderError::UnsupportedStream;
            self.errors.report(
                PluginError::from_render(PluginErrorKind::UnsupportedInput, &err)
                    .with_path(&file.path),
            );
            return TransformStatus::Dropped;
        }
        if file.contents.is_empty() {
            tracing::debug!("empty contents, passing through");
            return TransformStatus::PassedThrough;
        }
        if !is_html_path(&file.path, &self.html_extensions) {
            tracing::debug!("not an html file, passing through");
            return TransformStatus::PassedThrough;
        }
        let Some(meta) = file.meta.as_ref() else {
            tracing::debug!("no metadata, passing through");
            return TransformStatus::PassedThrough;
        };

        let context = RenderContext::build(file, &self.globals);
        let body = file.text().unwrap_or_default();
        let source = match parent_template(meta) {
            Some(template) => {
                tracing::debug!(template, "wrapping body in parent template");
                wrap(&body, template)
            }
            None => body,
        };

        let name = file.path.to_string_lossy().into_owned();
        match self.engine.render_source(&name, &source, &context) {
            Ok(rendered) => {
                file.contents = Contents::Buffer(rendered.into_bytes());
                TransformStatus::Rendered
            }
            Err(err) => {
                self.errors.report(
                    PluginError::from_render(PluginErrorKind::Template, &err)
                        .with_path(&file.path),
                );
                TransformStatus::Failed
            }
        }
    }
}

fn parent_template(meta: &Map<String, Value>) -> Option<&str> {
    meta.get("template")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}
