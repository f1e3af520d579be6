//! Caller-supplied template extensions.
//!
//! An extension is anything that can install itself into the render
//! environment under a name: a global function, a test, a custom loader
//! hook. [`FunctionTag`] covers the common case of a callable exposed to
//! templates as `{{ name(args...) }}`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::value::Rest;
use minijinja::{Environment, Value};

use crate::error::RenderError;

/// Installs a named extension into the render environment.
pub trait Extension: Send + Sync {
    fn install(&self, name: &str, env: &mut Environment<'static>);
}

impl<F> Extension for F
where
    F: Fn(&str, &mut Environment<'static>) + Send + Sync,
{
    fn install(&self, name: &str, env: &mut Environment<'static>) {
        self(name, env)
    }
}

/// A global function callable from templates.
///
/// Unlike filters, a failing function aborts the render it appears in; the
/// error surfaces as a template error of the whole file.
pub struct FunctionTag {
    call: Arc<dyn Fn(&[Value]) -> Result<Value, RenderError> + Send + Sync>,
}

impl FunctionTag {
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RenderError> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
        }
    }
}

impl Extension for FunctionTag {
    fn install(&self, name: &str, env: &mut Environment<'static>) {
        let call = Arc::clone(&self.call);
        env.add_function(
            name.to_string(),
            move |args: Rest<Value>| -> Result<Value, minijinja::Error> {
                call(args.as_slice()).map_err(Into::into)
            },
        );
    }
}

/// Name-keyed set of extensions. Last registration wins.
#[derive(Clone, Default)]
pub struct TagRegistry {
    entries: BTreeMap<String, Arc<dyn Extension>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, extension: impl Extension + 'static) {
        self.entries.insert(name.into(), Arc::new(extension));
    }

    /// Shorthand for registering a [`FunctionTag`].
    pub fn function<F>(&mut self, name: impl Into<String>, call: F)
    where
        F: Fn(&[Value]) -> Result<Value, RenderError> + Send + Sync + 'static,
    {
        self.insert(name, FunctionTag::new(call));
    }

    pub fn merge(&mut self, other: TagRegistry) {
        self.entries.extend(other.entries);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn install(&self, env: &mut Environment<'static>) {
        for (name, extension) in &self.entries {
            tracing::trace!(tag = %name, "installing extension");
            extension.install(name, env);
        }
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
