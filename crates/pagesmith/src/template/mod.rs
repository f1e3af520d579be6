//! Template rendering: the render capability, the filter and tag registries,
//! and the run-scoped state the built-in filters read from.

mod engine;
mod filters;
mod scope;
mod tags;

pub use engine::{search_path_loader, MiniJinjaEngine, TemplateEngine};
pub use filters::{Builtin, FilterFn, FilterRegistry};
pub use scope::{FilterScope, StackGuard};
pub use tags::{Extension, FunctionTag, TagRegistry};
