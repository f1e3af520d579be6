//! Per-file render context.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::file::ContentFile;

/// Variables visible to the top-level render of one file.
///
/// Built fresh for every file and discarded after the render. Contains the
/// file's metadata plus `filename`, `published`, `updated`, `stats` and
/// `global`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderContext(Map<String, Value>);

impl RenderContext {
    /// Assembles the context for `file`.
    ///
    /// Metadata `published`/`updated` win over the filesystem timestamps
    /// unless they are missing, `null`, `false` or empty.
    pub fn build(file: &ContentFile, globals: &Map<String, Value>) -> Self {
        let mut map = file.meta.clone().unwrap_or_default();

        let fallbacks = [
            ("published", file.stat.birthtime),
            ("updated", file.stat.mtime),
        ];
        for (key, at) in fallbacks {
            if is_absent(map.get(key)) {
                map.insert(key.to_string(), Value::String(at.to_rfc3339()));
            }
        }

        map.insert(
            "filename".to_string(),
            Value::String(file.path.to_string_lossy().into_owned()),
        );
        map.insert(
            "stats".to_string(),
            serde_json::to_value(&file.stat).unwrap_or(Value::Null),
        );
        map.insert("global".to_string(), Value::Object(globals.clone()));

        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
