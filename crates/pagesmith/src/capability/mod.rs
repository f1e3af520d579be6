//! External capabilities consumed by the filters: markdown conversion and
//! date formatting. Both are traits so a run can swap implementations.

pub mod date;
pub mod markdown;

pub use date::{named_mask, parse_date, DateFormatter, MaskFormatter, DEFAULT_MASK};
pub use markdown::{ComrakMarkdown, MarkdownConverter, MarkdownOptions};
