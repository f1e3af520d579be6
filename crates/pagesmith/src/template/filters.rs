//! Filter registry and the built-in content filters.
//!
//! Filters available to template authors:
//!
//! | Filter | Usage | Result |
//! |--------|-------|--------|
//! | `attributes` | `{{ "posts/a.md" \| attributes }}` | front-matter map of the file |
//! | `attributes` | `{{ "posts/a.md" \| attributes("title") }}` | one attribute, undefined if absent |
//! | `body` | `{{ "posts/a.md" \| body }}` | body of the file without its front matter |
//! | `render` | `{{ "posts/a.md" \| render }}` | the file rendered standalone with its own attributes |
//! | `markdown` | `{{ text \| markdown }}` | HTML |
//! | `date` | `{{ published \| date("isoDate") }}` | formatted date |
//!
//! A failing filter never aborts the render: its error is reported on the
//! run's error channel and the expression resolves to undefined, which
//! renders as nothing.
//!
//! # Registration Order
//!
//! The registry starts with the built-ins. Caller filters are inserted
//! afterwards under the same name-keyed map, so a caller filter named like a
//! built-in replaces it. Last registration wins.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use minijinja::value::Rest;
use minijinja::{Environment, State, Value};

use super::scope::FilterScope;
use crate::capability::{parse_date, DEFAULT_MASK};
use crate::error::{PluginError, PluginErrorKind, RenderError};

/// Signature of a caller-supplied filter.
///
/// Receives the piped value followed by any arguments. No file context is
/// injected; filters should be pure functions of their arguments.
pub type FilterFn = dyn Fn(&[Value]) -> Result<Value, RenderError> + Send + Sync;

/// The filters every run starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Attributes,
    Body,
    Render,
    Markdown,
    Date,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Attributes,
        Builtin::Body,
        Builtin::Render,
        Builtin::Markdown,
        Builtin::Date,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Attributes => "attributes",
            Builtin::Body => "body",
            Builtin::Render => "render",
            Builtin::Markdown => "markdown",
            Builtin::Date => "date",
        }
    }

    fn call(
        self,
        scope: &FilterScope,
        state: &State,
        value: &Value,
        args: &[Value],
    ) -> Result<Value, RenderError> {
        match self {
            Builtin::Attributes => attributes(scope, value, args.first()),
            Builtin::Body => body(scope, value),
            Builtin::Render => render(scope, state, value),
            Builtin::Markdown => markdown(scope, value),
            Builtin::Date => date(scope, value, args.first()),
        }
    }
}

#[derive(Clone)]
enum FilterEntry {
    Builtin(Builtin),
    Custom(Arc<FilterFn>),
}

/// Name-keyed set of filters installed into the render environment.
#[derive(Clone)]
pub struct FilterRegistry {
    entries: BTreeMap<String, FilterEntry>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistry {
    /// Creates a registry holding the built-in filters.
    pub fn new() -> Self {
        let entries = Builtin::ALL
            .iter()
            .map(|b| (b.name().to_string(), FilterEntry::Builtin(*b)))
            .collect();
        Self { entries }
    }

    /// Creates a registry with no filters at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a caller filter. Returns true when it replaced an existing
    /// entry of the same name.
    pub fn insert<F>(&mut self, name: impl Into<String>, filter: F) -> bool
    where
        F: Fn(&[Value]) -> Result<Value, RenderError> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self
            .entries
            .insert(name.clone(), FilterEntry::Custom(Arc::new(filter)))
            .is_some();
        if replaced {
            tracing::debug!(filter = %name, "filter overridden by later registration");
        }
        replaced
    }

    /// Merges `other` into this registry; entries from `other` win.
    pub fn merge(&mut self, other: FilterRegistry) {
        self.entries.extend(other.entries);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns true when `name` still resolves to a built-in.
    pub fn is_builtin(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(FilterEntry::Builtin(_)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installs every filter into `env`, routing failures to the scope's
    /// error channel.
    pub fn install(&self, env: &mut Environment<'static>, scope: &Arc<FilterScope>) {
        for (name, entry) in &self.entries {
            let name = name.clone();
            let entry = entry.clone();
            let scope = Arc::clone(scope);
            env.add_filter(
                name.clone(),
                move |state: &State, value: Value, args: Rest<Value>| -> Value {
                    let result = match &entry {
                        FilterEntry::Builtin(builtin) => builtin.call(&scope, state, &value, &args),
                        FilterEntry::Custom(filter) => {
                            let mut all = Vec::with_capacity(args.len() + 1);
                            all.push(value);
                            all.extend(args.iter().cloned());
                            filter(all.as_slice())
                        }
                    };
                    result.unwrap_or_else(|err| {
                        report(&scope, &name, &err);
                        Value::UNDEFINED
                    })
                },
            );
        }
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

fn report(scope: &FilterScope, name: &str, err: &RenderError) {
    let mut error = PluginError::new(PluginErrorKind::Filter, format!("{}: {}", name, err));
    if let Some(path) = scope.current_file() {
        error = error.with_path(path);
    }
    scope.errors().report(error);
}

fn expect_path(value: &Value) -> Result<&str, RenderError> {
    value.as_str().ok_or_else(|| {
        RenderError::argument(format!("expected a file path, got {:?}", value.kind()))
    })
}

fn is_missing(value: Option<&Value>) -> bool {
    value.map_or(true, |v| v.is_undefined() || v.is_none())
}

fn attributes(
    scope: &FilterScope,
    value: &Value,
    attribute: Option<&Value>,
) -> Result<Value, RenderError> {
    let path = expect_path(value)?;
    let matter = scope.read_matter(path)?;

    if is_missing(attribute) {
        return Ok(Value::from_serialize(&matter.attributes));
    }
    let key = attribute
        .and_then(|a| a.as_str())
        .ok_or_else(|| RenderError::argument("attribute name must be a string"))?;
    Ok(matter
        .attributes
        .get(key)
        .map(Value::from_serialize)
        .unwrap_or(Value::UNDEFINED))
}

fn body(scope: &FilterScope, value: &Value) -> Result<Value, RenderError> {
    let path = expect_path(value)?;
    Ok(Value::from(scope.read_matter(path)?.body))
}

fn render(scope: &FilterScope, state: &State, value: &Value) -> Result<Value, RenderError> {
    let path = expect_path(value)?;
    let matter = scope.read_matter(path)?;
    let _guard = scope.enter(Path::new(path))?;

    let source = if scope.is_html(Path::new(path)) {
        matter.body
    } else {
        scope.markdown().to_html(&matter.body)?
    };

    let context = Value::from_serialize(&matter.attributes);
    let rendered = state.env().render_named_str(path, &source, context)?;
    Ok(Value::from_safe_string(rendered))
}

fn markdown(scope: &FilterScope, value: &Value) -> Result<Value, RenderError> {
    if value.is_undefined() || value.is_none() {
        return Ok(Value::from_safe_string(String::new()));
    }
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    Ok(Value::from_safe_string(scope.markdown().to_html(&text)?))
}

fn date(scope: &FilterScope, value: &Value, format: Option<&Value>) -> Result<Value, RenderError> {
    let input = serde_json::to_value(value)?;
    let date = parse_date(&input)?;
    let spec = match format {
        Some(f) if !is_missing(Some(f)) => f
            .as_str()
            .ok_or_else(|| RenderError::argument("date format must be a string"))?,
        _ => DEFAULT_MASK,
    };
    Ok(Value::from(scope.dates().format(&date, spec)?))
}
