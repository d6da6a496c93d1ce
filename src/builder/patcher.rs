//! Splicing prototypes into the merged sketch source.

use crate::ctags::Prototype;

/// Insert `prototypes` before `insertion_line` of the main sketch file.
///
/// `insertion_line` counts lines of the main file; `line_offset` is the
/// number of merged-source lines that precede it. The block ends with a
/// `#line` directive so compiler diagnostics keep pointing at the
/// user's lines. The source is returned unchanged when there is nothing
/// to insert or the target line does not exist.
pub fn patch_source(
    source: &str,
    prototypes: &[Prototype],
    insertion_line: Option<usize>,
    line_offset: usize,
) -> String {
    let Some(line) = insertion_line else {
        return source.to_string();
    };
    if prototypes.is_empty() {
        return source.to_string();
    }

    let target = line + line_offset;
    let Some(at) = line_start(source, target) else {
        tracing::debug!("insertion line {} is outside the source, not patching", target);
        return source.to_string();
    };

    let mut block = prototypes
        .iter()
        .map(Prototype::declaration)
        .collect::<Vec<_>>()
        .join("\n");
    block.push_str(&format!("\n#line {}\n", line));

    let mut patched = String::with_capacity(source.len() + block.len());
    patched.push_str(&source[..at]);
    patched.push_str(&block);
    patched.push_str(&source[at..]);
    patched
}

/// Byte offset of the start of 1-based `line`.
fn line_start(source: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    if line == 1 {
        return Some(0);
    }
    source.match_indices('\n').nth(line - 2).map(|(at, _)| at + 1)
}
