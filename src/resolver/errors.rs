//! Library resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::library::LibraryError;
use crate::util::diagnostic::Diagnostic;

/// Error during include discovery.
///
/// Compiler output is carried verbatim and is the whole `Display` text:
/// the compiler's own message already names the file and line.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{output}")]
    UnresolvedHeader {
        header: String,
        source_file: PathBuf,
        output: String,
    },

    #[error("{output}")]
    Compiler { source_file: PathBuf, output: String },

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnresolvedHeader {
                header,
                source_file,
                ..
            } => Diagnostic::error(format!("no library provides `{}`", header))
                .with_location(source_file)
                .with_suggestion(format!(
                    "Install a library that contains `{}` into one of the libraries folders",
                    header
                ))
                .with_suggestion(
                    "Add the folder holding the library with `--libraries <DIR>`".to_string(),
                ),

            ResolveError::Compiler { source_file, .. } => {
                Diagnostic::error("preprocessing failed").with_location(source_file)
            }

            ResolveError::Library(err) => err.to_diagnostic(),
        }
    }

    /// Compiler output to show before the diagnostic, if any.
    pub fn compiler_output(&self) -> Option<&str> {
        match self {
            ResolveError::UnresolvedHeader { output, .. }
            | ResolveError::Compiler { output, .. } => Some(output),
            ResolveError::Library(_) => None,
        }
    }
}
