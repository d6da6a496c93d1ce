//! Prototype generation from ctags output.
//!
//! Sketch code may call a function before defining it. The preprocessed
//! sketch is listed with ctags, the listing is filtered down to free
//! functions that still lack a declaration, and a prototype is produced
//! for each of them together with the line they must be inserted before.

pub mod clinkage;
pub mod parser;
pub mod prototypes;

use std::path::Path;

pub use parser::{parse, parse_and_filter, Modifiers, Scope, SkipReason, Tag, TagKind};
pub use prototypes::{insertion_line, synthesize, Prototype};

/// Prototypes and insertion line for a raw ctags listing.
pub fn prototypes_from_tags(raw: &str, main_file: Option<&Path>) -> (Vec<Prototype>, Option<usize>) {
    let tags = parse_and_filter(raw);
    tracing::debug!(
        "{} tags, {} kept",
        tags.len(),
        tags.iter().filter(|t| !t.is_skipped()).count()
    );
    synthesize(&tags, main_file)
}
