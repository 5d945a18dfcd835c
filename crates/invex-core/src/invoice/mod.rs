//! Template identification and field extraction.

mod extractor;
mod matcher;
pub mod pattern;

pub use extractor::extract;
pub use matcher::select;
pub use pattern::{check_template, PatternIssue};
