//! A run: one configured environment applied to a sequence of files.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::diagnostics::ErrorChannel;
use crate::error::PluginError;
use crate::file::ContentFile;
use crate::template::{FilterScope, MiniJinjaEngine};
use crate::transform::{FileTransform, TransformStatus, Transformed};

/// Error ending a run early.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// `fail_on_error` is set and a file reported errors.
    #[error("aborted after {} error(s) in {}", errors.len(), path.display())]
    Aborted {
        /// The file that reported the errors.
        path: PathBuf,
        errors: Vec<PluginError>,
        /// The failing file as the transform left it. `None` when it was
        /// dropped.
        file: Option<ContentFile>,
        /// Files finished before the failing one, in input order.
        completed: Vec<ContentFile>,
    },
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Output files in input order. Dropped files are absent.
    pub files: Vec<ContentFile>,
    /// Every error reported during the run.
    pub errors: Vec<PluginError>,
    pub rendered: usize,
    pub passed_through: usize,
    pub failed: usize,
    pub dropped: usize,
}

impl RunSummary {
    fn record(&mut self, transformed: Transformed) {
        match transformed.status {
            TransformStatus::Rendered => self.rendered += 1,
            TransformStatus::PassedThrough => self.passed_through += 1,
            TransformStatus::Failed => self.failed += 1,
            TransformStatus::Dropped => self.dropped += 1,
        }
        self.errors.extend(transformed.errors);
        self.files.extend(transformed.file);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The configured stage.
///
/// Built once per run. Files are processed strictly one after another; a
/// filter rendering another file finishes before the next file starts.
pub struct Pipeline {
    config: PipelineConfig,
    errors: ErrorChannel,
    transform: FileTransform<MiniJinjaEngine>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let errors = ErrorChannel::new();
        let scope = Arc::new(FilterScope::new(
            config.root(),
            config.html_extensions().to_vec(),
            config.markdown(),
            config.dates(),
            errors.clone(),
        ));
        let engine = MiniJinjaEngine::new(
            config.paths().to_vec(),
            config.autoescape(),
            config.filters(),
            config.tags(),
            scope,
        );
        let transform = FileTransform::new(
            engine,
            config.variables().clone(),
            config.html_extensions().to_vec(),
            errors.clone(),
        );

        Self {
            config,
            errors,
            transform,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The run's error channel. Subscribe here to observe errors as they
    /// are reported.
    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Transforms a single file.
    pub fn process(&self, file: ContentFile) -> Transformed {
        self.transform.apply(file)
    }

    /// Transforms `files` in order.
    ///
    /// With `fail_on_error` unset every file is processed and all errors are
    /// collected in the summary. With it set, the run stops after the first
    /// file that reported an error.
    pub fn run<I>(&self, files: I) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = ContentFile>,
    {
        let mut summary = RunSummary::default();

        for file in files {
            let path = file.path.clone();
            let transformed = self.process(file);

            if self.config.is_fail_on_error() && transformed.has_errors() {
                tracing::error!(path = %path.display(), "aborting run");
                return Err(PipelineError::Aborted {
                    path,
                    errors: transformed.errors,
                    file: transformed.file,
                    completed: summary.files,
                });
            }
            summary.record(transformed);
        }

        tracing::info!(
            rendered = summary.rendered,
            passed_through = summary.passed_through,
            failed = summary.failed,
            dropped = summary.dropped,
            errors = summary.errors.len(),
            "run finished"
        );
        Ok(summary)
    }
}
