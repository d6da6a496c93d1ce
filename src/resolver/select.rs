//! Choosing one library for a header.
//!
//! Several libraries often ship a header with the same name (`Servo.h`
//! exists in the bundled platform library, in a user fork, and in a
//! third-party rewrite). Selection prefers, in order:
//!
//! 1. the only candidate;
//! 2. a candidate that is already imported;
//! 3. a user library compatible with the platform whose name matches the
//!    header best;
//! 4. a platform-bundled library whose name matches the header best;
//! 5. the last candidate.

use std::sync::Arc;

use crate::core::library::Library;
use crate::core::platform::PlatformContext;
use crate::resolver::imported::{ImportedSet, Resolution};

/// Pick a library for `header`, or `None` if nothing provides it.
pub fn select_library(
    header: &str,
    candidates: &[Arc<Library>],
    imported: &ImportedSet,
    platforms: &PlatformContext,
) -> Option<Arc<Library>> {
    resolve_library(header, candidates, imported, platforms).map(|r| r.library)
}

/// Pick a library for `header` and describe the choice.
pub fn resolve_library(
    header: &str,
    candidates: &[Arc<Library>],
    imported: &ImportedSet,
    platforms: &PlatformContext,
) -> Option<Resolution> {
    let (chosen, from_platform) = choose(header, candidates, imported, platforms)?;

    let library = match imported.find_by_name(&chosen.name) {
        Some(same_name) => Arc::clone(same_name),
        None => chosen,
    };

    let not_used = candidates
        .iter()
        .filter(|c| !c.same_as(&library))
        .cloned()
        .collect();

    Some(Resolution {
        library,
        from_platform,
        not_used,
    })
}

fn choose(
    header: &str,
    candidates: &[Arc<Library>],
    imported: &ImportedSet,
    platforms: &PlatformContext,
) -> Option<(Arc<Library>, bool)> {
    let bundled = |lib: &Arc<Library>| platforms.contains(&lib.folder);

    match candidates {
        [] => return None,
        [only] => return Some((Arc::clone(only), bundled(only))),
        _ => {}
    }

    if let Some(lib) = candidates.iter().find(|c| imported.contains(c)) {
        return Some((Arc::clone(lib), bundled(lib)));
    }

    let (inside, outside): (Vec<_>, Vec<_>) =
        candidates.iter().cloned().partition(|lib| bundled(lib));

    for platform in platforms.by_priority() {
        let compatible: Vec<_> = outside
            .iter()
            .filter(|lib| lib.supports_architecture(&platform.id))
            .cloned()
            .collect();
        if let Some(lib) = best_library_with_header(header, &compatible) {
            return Some((lib, false));
        }
    }

    for platform in platforms.by_priority() {
        let within: Vec<_> = inside
            .iter()
            .filter(|lib| lib.is_within(&platform.folder))
            .cloned()
            .collect();
        if let Some(lib) = best_library_with_header(header, &within) {
            return Some((lib, true));
        }
    }

    // Nothing matched by name: the last candidate wins. Existing sketches
    // rely on this, surprising as it is.
    let last = candidates.last()?;
    Some((Arc::clone(last), bundled(last)))
}

/// The library whose name best matches the header's file stem.
///
/// The stem is tried verbatim, then lower-cased, against each library
/// name in turn: exact match, `<stem>-master`, prefix, suffix, substring.
/// Library names are compared with characters outside `[A-Za-z0-9._-]`
/// replaced by `_`, so `Calculus Lib` matches `calculus_lib.h`.
pub fn best_library_with_header(header: &str, libraries: &[Arc<Library>]) -> Option<Arc<Library>> {
    let stem = match header.rfind('.') {
        Some(dot) => &header[..dot],
        None => header,
    };

    let verbatim: Vec<String> = libraries.iter().map(|l| sanitize_name(&l.name)).collect();
    let lowered: Vec<String> = verbatim.iter().map(|n| n.to_lowercase()).collect();

    let passes = [(stem.to_string(), &verbatim), (stem.to_lowercase(), &lowered)];
    for (stem, names) in passes {
        for rule in NameMatch::ORDER {
            if let Some(idx) = names.iter().position(|n| rule.matches(n, &stem)) {
                return Some(Arc::clone(&libraries[idx]));
            }
        }
    }

    None
}

#[derive(Debug, Clone, Copy)]
enum NameMatch {
    Exact,
    Master,
    Prefix,
    Suffix,
    Contains,
}

impl NameMatch {
    const ORDER: [NameMatch; 5] = [
        NameMatch::Exact,
        NameMatch::Master,
        NameMatch::Prefix,
        NameMatch::Suffix,
        NameMatch::Contains,
    ];

    fn matches(self, name: &str, stem: &str) -> bool {
        match self {
            NameMatch::Exact => name == stem,
            NameMatch::Master => name.strip_suffix("-master") == Some(stem),
            NameMatch::Prefix => name.starts_with(stem),
            NameMatch::Suffix => name.ends_with(stem),
            NameMatch::Contains => name.contains(stem),
        }
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
