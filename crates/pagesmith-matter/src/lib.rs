//! YAML front-matter splitter for content files.
//!
//! A content file may start with a metadata block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [a, b]
//! ---
//! Body text starts here.
//! ```
//!
//! [`split`] separates that block from the body. It never fails: text without
//! a recognizable block comes back untouched with empty attributes, and a
//! block whose YAML does not parse to a mapping yields empty attributes.
//!
//! # Example
//!
//! ```rust
//! use pagesmith_matter::split;
//!
//! let matter = split("---\ntitle: Hello\n---\nBody\n");
//! assert_eq!(matter.attributes["title"], "Hello");
//! assert_eq!(matter.body, "Body\n");
//!
//! let plain = split("No metadata here");
//! assert!(plain.attributes.is_empty());
//! assert_eq!(plain.body, "No metadata here");
//! ```
//!
//! # Fence Syntax
//!
//! - Opening line: `---`, `---yaml` or `= yaml =`
//! - Closing line: `---` (or `= yaml =` when opened that way) or `...`
//! - Trailing whitespace on fence lines is ignored; `\r\n` endings are accepted
//! - A leading UTF-8 byte-order mark is skipped

use serde_json::{Map, Value};

/// Attribute map produced from a front-matter block.
pub type Attributes = Map<String, Value>;

const BOM: char = '\u{feff}';

/// Result of splitting a content file into metadata and body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontMatter {
    /// Parsed attributes. Empty (never absent) when there is no usable block.
    pub attributes: Attributes,
    /// Everything after the closing fence, or the whole input when there is
    /// no block.
    pub body: String,
    /// Raw YAML text between the fences, when a block was found.
    pub frontmatter: Option<String>,
    /// 1-based line number where the body begins.
    pub body_line: usize,
}

impl FrontMatter {
    /// Looks up a single attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns true when a fenced block was present, even if its YAML was unusable.
    pub fn has_block(&self) -> bool {
        self.frontmatter.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fence {
    Dashes,
    YamlMarker,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" | "---yaml" => Some(Fence::Dashes),
            "= yaml =" => Some(Fence::YamlMarker),
            _ => None,
        }
    }

    fn closes(self, line: &str) -> bool {
        let line = line.trim_end();
        if line == "..." {
            return true;
        }
        match self {
            Fence::Dashes => line == "---",
            Fence::YamlMarker => line == "= yaml =",
        }
    }
}

/// Splits raw text into attributes and body.
pub fn split(raw: &str) -> FrontMatter {
    match locate(raw) {
        Some(block) => FrontMatter {
            attributes: parse_attributes(block.yaml),
            body: raw[block.body_start..].to_string(),
            frontmatter: Some(block.yaml.to_string()),
            body_line: block.body_line,
        },
        None => FrontMatter {
            attributes: Attributes::new(),
            body: raw.to_string(),
            frontmatter: None,
            body_line: 1,
        },
    }
}

/// Splits a raw byte buffer, replacing invalid UTF-8 sequences.
pub fn split_bytes(raw: &[u8]) -> FrontMatter {
    split(&String::from_utf8_lossy(raw))
}

/// Returns true when `raw` starts with a complete front-matter block.
pub fn has_front_matter(raw: &str) -> bool {
    locate(raw).is_some()
}

struct Block<'a> {
    yaml: &'a str,
    body_start: usize,
    body_line: usize,
}

fn locate(raw: &str) -> Option<Block<'_>> {
    let start = if raw.starts_with(BOM) { BOM.len_utf8() } else { 0 };
    let text = &raw[start..];

    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if !first.ends_with('\n') {
        return None;
    }
    let fence = Fence::open(first)?;

    let yaml_start = start + first.len();
    let mut offset = yaml_start;
    let mut line_no = 1;

    for line in lines {
        line_no += 1;
        if fence.closes(line) {
            return Some(Block {
                yaml: &raw[yaml_start..offset],
                body_start: offset + line.len(),
                body_line: line_no + 1,
            });
        }
        offset += line.len();
    }

    None
}

fn parse_attributes(yaml: &str) -> Attributes {
    if yaml.trim().is_empty() {
        return Attributes::new();
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => map,
        _ => Attributes::new(),
    }
}
