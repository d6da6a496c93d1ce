//! Detection of functions declared inside `extern "C"` regions.
//!
//! Three spellings are recognized:
//!
//! ```text
//! extern "C" void foo();
//!
//! extern "C" {
//!     void foo();
//! }
//!
//! extern "C"
//! {
//!     void foo();
//! }
//! ```
//!
//! Comments are not stripped: doing so would shift line numbers.

use std::collections::{HashMap, HashSet};
use std::fs;

use crate::ctags::parser::{strip_blanks, Tag};

const EXTERN_C_DECL: &str = "extern\"C\"";

/// Add the C-linkage modifier to tags located in an `extern "C"` region.
pub fn mark_c_linkage(mut tags: Vec<Tag>) -> Vec<Tag> {
    let regions = find_c_linkage_lines(&tags);
    for tag in tags.iter_mut() {
        if regions
            .get(&tag.file)
            .is_some_and(|lines| lines.contains(&tag.line))
        {
            tag.modifiers.c_linkage = true;
        }
    }
    tags
}

/// Lines inside `extern "C"` regions, per tagged file.
///
/// Each file is read once; unreadable files have no regions.
pub fn find_c_linkage_lines(tags: &[Tag]) -> HashMap<String, HashSet<usize>> {
    let mut regions = HashMap::new();
    for tag in tags {
        if regions.contains_key(&tag.file) {
            continue;
        }
        let lines = match fs::read_to_string(&tag.file) {
            Ok(text) => c_linkage_lines(&text),
            Err(err) => {
                tracing::debug!("cannot scan {} for extern \"C\": {}", tag.file, err);
                HashSet::new()
            }
        };
        regions.insert(tag.file.clone(), lines);
    }
    regions
}

/// 1-based line numbers of `text` that lie in an `extern "C"` region.
pub fn c_linkage_lines(text: &str) -> HashSet<usize> {
    let mut lines = HashSet::new();
    let mut in_scope = false;
    let mut depth: i64 = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = strip_blanks(raw);
        if line.is_empty() {
            continue;
        }

        // `extern "C"` alone on a line: the brace follows on the next one.
        let mut awaiting_brace = false;
        if line.contains(EXTERN_C_DECL) {
            in_scope = true;
            awaiting_brace = line.len() == EXTERN_C_DECL.len();
        }

        if in_scope {
            lines.insert(index + 1);
        }

        depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
        if depth == 0 && !awaiting_brace {
            in_scope = false;
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctags::parser::parse_and_filter;
    use std::io::Write;

    fn sorted(lines: HashSet<usize>) -> Vec<usize> {
        let mut lines: Vec<_> = lines.into_iter().collect();
        lines.sort();
        lines
    }

    #[test]
    fn test_single_line_declaration() {
        let text = "void a() {}\nextern \"C\" void foo() {}\nvoid b() {}\n";
        assert_eq!(sorted(c_linkage_lines(text)), vec![2]);
    }

    #[test]
    fn test_block_on_same_line() {
        let text = "extern \"C\" {\n  void foo() {\n  }\n\n  void bar();\n}\nvoid after() {}\n";
        assert_eq!(sorted(c_linkage_lines(text)), vec![1, 2, 3, 5, 6]);
    }

    #[test]
    fn test_brace_on_next_line() {
        let text = "extern \"C\"\n{\n  void foo();\n}\nvoid after();\n";
        assert_eq!(sorted(c_linkage_lines(text)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pipeline_marks_tags_in_region() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "extern \"C\" {{\nvoid foo() {{\n}}\n}}\nvoid bar() {{\n}}\n"
        )
        .unwrap();
        let path = file.path().display().to_string();

        let raw = format!(
            "foo\t{path}\t/^void foo() {{$/;\"\tkind:function\tline:2\tsignature:()\treturntype:void\n\
             bar\t{path}\t/^void bar() {{$/;\"\tkind:function\tline:5\tsignature:()\treturntype:void\n"
        );
        let tags = parse_and_filter(&raw);

        assert!(tags[0].modifiers.c_linkage);
        assert!(!tags[1].modifiers.c_linkage);
        assert_eq!(tags[0].modifiers.to_string(), "extern \"C\"");
    }
}
