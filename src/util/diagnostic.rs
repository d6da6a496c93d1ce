//! User-facing diagnostic messages.
//!
//! Errors name what failed, where, and what the user can do about it.
//! Compiler output is never folded into a diagnostic: it is printed
//! first, verbatim, and the diagnostic follows.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages.
pub mod suggestions {
    /// No config and no flags named a libraries folder.
    pub const NO_LIBRARY_FOLDERS: &str =
        "help: Pass `--libraries <DIR>` or set `libraries.folders` in .sketchport/config.toml";

    /// No core platform is configured.
    pub const NO_PLATFORM: &str =
        "help: Set `platform.core` in .sketchport/config.toml to the installed hardware platform";

    /// Preprocessing failed.
    pub const PREPROCESS_FAILED: &str =
        "help: Run `sketchport --verbose preprocess` to see every tool invocation";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related file or folder
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let severity = match (self.severity, color) {
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m".to_string(),
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (Severity::Note, true) => "\x1b[1;36mnote\x1b[0m".to_string(),
            (severity, false) => severity.to_string(),
        };

        let mut output = format!("{}: {}\n", severity, self.message);

        if let Some(path) = &self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("\n{}: consider:\n", help));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Several libraries provide the same header.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("multiple libraries were found for `{header}`")]
#[diagnostic(
    severity(Warning),
    code(sketchport::resolve::multiple_libraries),
    help("Remove the libraries you do not want, or rename their folders")
)]
pub struct MultipleLibrariesWarning {
    pub header: String,
    pub used: PathBuf,
    pub not_used: Vec<PathBuf>,
}

impl MultipleLibrariesWarning {
    /// Plain-text report for the log.
    pub fn report(&self) -> String {
        let mut text = format!("{}\n  Used: {}", self, self.used.display());
        for folder in &self.not_used {
            text.push_str(&format!("\n  Not used: {}", folder.display()));
        }
        text
    }
}

/// An imported library does not declare the target architecture.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("library `{library}` claims to run on {architectures} architecture(s) and may be incompatible with your current board which runs on {target} architecture(s)")]
#[diagnostic(severity(Warning), code(sketchport::resolve::architecture))]
pub struct ArchitectureWarning {
    pub library: String,
    pub architectures: String,
    pub target: String,
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
