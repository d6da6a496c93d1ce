//! Library records loaded from library folders.
//!
//! A library folder either carries a `library.properties` file (the
//! current format) or not (a legacy library). Current-format libraries use
//! one of two layouts:
//!
//! - **Recursive**: sources live under `src/` and are compiled recursively.
//! - **Flat**: sources live in the root folder, plus an optional `utility/`
//!   subfolder, non-recursively.
//!
//! Structural problems are recorded as [`LibraryDefect`]s rather than
//! failing the whole catalog; they only become fatal once something tries
//! to import the library.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::properties::Properties;
use crate::util::diagnostic::Diagnostic;

/// Name of the metadata file that marks a current-format library.
pub const LIBRARY_PROPERTIES: &str = "library.properties";

/// Properties every current-format library must declare.
pub const MANDATORY_PROPERTIES: &[&str] = &["name", "version", "author", "maintainer"];

/// Properties that default to `-` when absent.
pub const OPTIONAL_PROPERTIES: &[&str] = &["sentence", "paragraph", "url"];

/// Valid values for the `category` property.
pub const CATEGORIES: &[&str] = &[
    "Display",
    "Communication",
    "Signal Input/Output",
    "Sensors",
    "Device Control",
    "Timing",
    "Data Storage",
    "Data Processing",
    "Other",
    "Uncategorized",
];

pub const CATEGORY_UNCATEGORIZED: &str = "Uncategorized";

pub const LICENSE_UNSPECIFIED: &str = "Unspecified";

/// Extensions of files compiled as part of a library.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "S"];

/// Folder names that belong to version control, never to a library.
pub const SOURCE_CONTROL_FOLDERS: &[&str] =
    &["CVS", "RCS", ".git", ".github", ".svn", ".hg", ".bzr", "SCCS"];

const SRC_FOLDER: &str = "src";
const UTILITY_FOLDER: &str = "utility";
const ARCH_FOLDER: &str = "arch";

/// Source layout of a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryLayout {
    /// Sources in the root folder and `utility/`, non-recursive.
    Flat,
    /// Sources under `src/`, recursive.
    Recursive,
}

impl fmt::Display for LibraryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryLayout::Flat => write!(f, "flat"),
            LibraryLayout::Recursive => write!(f, "recursive"),
        }
    }
}

/// Architectures a library declares support for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Architectures {
    /// `*`, or no declaration at all.
    Any,
    /// An explicit list of platform ids.
    List(Vec<String>),
}

impl Architectures {
    /// Parse a comma-separated `architectures` value.
    pub fn parse(value: &str) -> Self {
        let archs: Vec<String> = value
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        if archs.is_empty() || archs.iter().any(|a| a == "*") {
            Architectures::Any
        } else {
            Architectures::List(archs)
        }
    }

    /// Whether a platform with the given id can use the library.
    pub fn supports(&self, platform_id: &str) -> bool {
        match self {
            Architectures::Any => true,
            Architectures::List(archs) => archs.iter().any(|a| a == platform_id),
        }
    }
}

impl fmt::Display for Architectures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architectures::Any => write!(f, "*"),
            Architectures::List(archs) => write!(f, "{}", archs.join(",")),
        }
    }
}

impl Serialize for Architectures {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A structural problem found while loading a library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryDefect {
    #[error("missing required property `{0}` in library.properties")]
    MissingProperty(&'static str),

    #[error("library can't use both `src` and `utility` folders")]
    SrcAndUtility,

    #[error("`arch` folder is not supported")]
    ArchFolder,
}

/// Error raised when a defective library is needed by a sketch.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library `{name}` at {} is malformed: {defect}", folder.display())]
    Malformed {
        name: String,
        folder: PathBuf,
        defect: LibraryDefect,
    },
}

impl LibraryError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LibraryError::Malformed {
                name,
                folder,
                defect,
            } => {
                let diag = Diagnostic::error(format!("library `{}` is malformed", name))
                    .with_location(folder)
                    .with_context(defect.to_string());

                match defect {
                    LibraryDefect::MissingProperty(prop) => diag.with_suggestion(format!(
                        "Add `{}=...` to {}",
                        prop,
                        folder.join(LIBRARY_PROPERTIES).display()
                    )),
                    LibraryDefect::SrcAndUtility => diag.with_suggestion(
                        "Move the contents of `utility/` into `src/`".to_string(),
                    ),
                    LibraryDefect::ArchFolder => diag.with_suggestion(
                        "Use the `architectures` property instead of an `arch/` folder"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// A library available to sketches.
#[derive(Debug, Clone, Serialize)]
pub struct Library {
    /// Folder base name; the identity used by header heuristics.
    pub name: String,
    /// The `name` property, or the folder name for legacy libraries.
    pub real_name: String,
    pub folder: PathBuf,
    /// Folder added to the include path when the library is imported.
    pub src_folder: PathBuf,
    pub layout: LibraryLayout,
    pub architectures: Architectures,
    pub category: String,
    pub license: String,
    pub legacy: bool,
    pub version: String,
    pub author: String,
    pub maintainer: String,
    pub sentence: String,
    pub paragraph: String,
    pub url: String,
    pub dot_a_linkage: bool,
    #[serde(skip)]
    pub properties: Properties,
    #[serde(skip)]
    defects: Vec<LibraryDefect>,
}

impl Library {
    /// Load the library rooted at `folder`.
    ///
    /// I/O failures are returned as errors; layout and metadata problems
    /// are recorded as defects on the returned library.
    pub fn load(folder: &Path) -> Result<Self> {
        if folder.join(LIBRARY_PROPERTIES).is_file() {
            Self::load_current(folder)
        } else {
            Ok(Self::legacy(folder))
        }
    }

    /// A library without `library.properties`.
    pub fn legacy(folder: &Path) -> Self {
        let name = folder_name(folder);
        Library {
            real_name: name.clone(),
            name,
            folder: folder.to_path_buf(),
            src_folder: folder.to_path_buf(),
            layout: LibraryLayout::Flat,
            architectures: Architectures::Any,
            category: CATEGORY_UNCATEGORIZED.to_string(),
            license: LICENSE_UNSPECIFIED.to_string(),
            legacy: true,
            version: String::new(),
            author: String::new(),
            maintainer: String::new(),
            sentence: String::new(),
            paragraph: String::new(),
            url: String::new(),
            dot_a_linkage: false,
            properties: Properties::new(),
            defects: Vec::new(),
        }
    }

    fn load_current(folder: &Path) -> Result<Self> {
        let mut props = Properties::load(&folder.join(LIBRARY_PROPERTIES))?;
        let mut defects = Vec::new();

        if !props.has("maintainer") {
            if let Some(email) = props.get("email").filter(|e| !e.is_empty()) {
                let email = email.to_string();
                props.set("maintainer", email);
            }
        }

        if folder.join(ARCH_FOLDER).is_dir() {
            defects.push(LibraryDefect::ArchFolder);
        }

        for prop in MANDATORY_PROPERTIES {
            if props.get(prop).is_none() {
                defects.push(LibraryDefect::MissingProperty(*prop));
            }
        }

        for prop in OPTIONAL_PROPERTIES {
            if !props.has(prop) {
                props.set(*prop, "-");
            }
        }

        let (layout, src_folder) = if folder.join(SRC_FOLDER).is_dir() {
            if folder.join(UTILITY_FOLDER).is_dir() {
                defects.push(LibraryDefect::SrcAndUtility);
            }
            (LibraryLayout::Recursive, folder.join(SRC_FOLDER))
        } else {
            (LibraryLayout::Flat, folder.to_path_buf())
        };

        let real_name = props.get_or("name", &folder_name(folder));
        warn_spurious_folders(folder, &real_name)?;

        let mut category = props.get("category").unwrap_or_default().trim().to_string();
        if !CATEGORIES.contains(&category.as_str()) {
            tracing::warn!(
                "Category '{}' in library {} is not valid. Setting to '{}'",
                category,
                real_name,
                CATEGORY_UNCATEGORIZED
            );
            category = CATEGORY_UNCATEGORIZED.to_string();
        }

        let field = |key: &str| props.get(key).unwrap_or_default().trim().to_string();

        Ok(Library {
            name: folder_name(folder),
            real_name,
            folder: folder.to_path_buf(),
            src_folder,
            layout,
            architectures: Architectures::parse(props.get("architectures").unwrap_or("*")),
            category,
            license: props.get_or("license", LICENSE_UNSPECIFIED),
            legacy: false,
            version: field("version"),
            author: field("author"),
            maintainer: field("maintainer"),
            sentence: field("sentence"),
            paragraph: field("paragraph"),
            url: field("url"),
            dot_a_linkage: field("dot_a_linkage") == "true",
            defects,
            properties: props,
        })
    }

    /// Defects recorded at load time.
    pub fn defects(&self) -> &[LibraryDefect] {
        &self.defects
    }

    /// Fail if the library has a defect that prevents importing it.
    pub fn ensure_importable(&self) -> Result<(), LibraryError> {
        match self.defects.first() {
            Some(defect) => Err(LibraryError::Malformed {
                name: self.name.clone(),
                folder: self.folder.clone(),
                defect: defect.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Whether the library declares support for a platform id.
    pub fn supports_architecture(&self, platform_id: &str) -> bool {
        self.architectures.supports(platform_id)
    }

    /// Whether the library lives under `folder`.
    pub fn is_within(&self, folder: &Path) -> bool {
        self.folder.starts_with(folder)
    }

    /// Same library, compared by source folder.
    pub fn same_as(&self, other: &Library) -> bool {
        self.src_folder == other.src_folder
    }

    /// Header files directly inside the source folder.
    pub fn headers(&self) -> Result<Vec<String>> {
        let mut headers = Vec::new();
        for path in files_in(&self.src_folder, false)? {
            if path.extension().is_some_and(|ext| ext == "h") {
                if let Some(name) = path.file_name() {
                    headers.push(name.to_string_lossy().into_owned());
                }
            }
        }
        headers.sort();
        Ok(headers)
    }

    /// Files compiled when the library is imported.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = match self.layout {
            LibraryLayout::Recursive => files_in(&self.src_folder, true)?,
            LibraryLayout::Flat => {
                let mut files = files_in(&self.src_folder, false)?;
                let utility = self.src_folder.join(UTILITY_FOLDER);
                if utility.is_dir() {
                    files.extend(files_in(&utility, false)?);
                }
                files
            }
        };

        files.retain(|path| is_source_file(path));
        files.sort();
        Ok(files)
    }
}

/// Whether a file is compiled as library source.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Hidden entries and source control folders.
pub fn is_ignored_entry(name: &str) -> bool {
    name.starts_with('.') || SOURCE_CONTROL_FOLDERS.contains(&name)
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn files_in(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(folder).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| !is_ignored_entry(&e.file_name().to_string_lossy()))
    {
        let entry = entry.with_context(|| format!("failed to read {}", folder.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn warn_spurious_folders(folder: &Path, library_name: &str) -> Result<()> {
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("failed to read directory: {}", folder.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && is_ignored_entry(&name) {
            tracing::warn!(
                "WARNING: Spurious {} folder in '{}' library",
                name,
                library_name
            );
        }
    }
    Ok(())
}
