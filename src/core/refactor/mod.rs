//! Context-aware renaming: split source into code, string and comment
//! segments, then rewrite whole identifiers inside code segments only.

mod lexer;
mod rename;

pub use lexer::{segment, Segment, SegmentKind};
pub use rename::{rename_one, rename_text, RenameOutcome, SkippedOccurrence};
