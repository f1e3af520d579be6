//! Markdown-to-HTML conversion.

use serde::Deserialize;

use crate::error::RenderError;

/// Converts markdown text to HTML.
pub trait MarkdownConverter: Send + Sync {
    fn to_html(&self, text: &str) -> Result<String, RenderError>;
}

/// Extension switches for [`ComrakMarkdown`].
///
/// Defaults follow GitHub-flavoured markdown and let raw HTML through,
/// since content files routinely mix the two.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkdownOptions {
    pub tables: bool,
    pub strikethrough: bool,
    pub autolink: bool,
    pub tasklist: bool,
    pub footnotes: bool,
    pub smart_punctuation: bool,
    pub raw_html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
            smart_punctuation: false,
            raw_html: true,
        }
    }
}

/// [`MarkdownConverter`] backed by comrak.
#[derive(Debug, Clone, Default)]
pub struct ComrakMarkdown {
    options: MarkdownOptions,
}

impl ComrakMarkdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    fn apply(&self, options: &mut comrak::Options) {
        options.extension.table = self.options.tables;
        options.extension.strikethrough = self.options.strikethrough;
        options.extension.autolink = self.options.autolink;
        options.extension.tasklist = self.options.tasklist;
        options.extension.footnotes = self.options.footnotes;
        options.parse.smart = self.options.smart_punctuation;
        options.render.r#unsafe = self.options.raw_html;
    }
}

impl MarkdownConverter for ComrakMarkdown {
    fn to_html(&self, text: &str) -> Result<String, RenderError> {
        let mut options = comrak::Options::default();
        self.apply(&mut options);
        Ok(comrak::markdown_to_html(text, &options))
    }
}
