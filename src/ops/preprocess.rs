//! Implementation of `sketchport preprocess`.
//!
//! The sketch is merged into one C++ file, the libraries it needs are
//! discovered, and prototypes are added so functions can be called before
//! their definition. Everything is written below the build folder:
//!
//! ```text
//! build/
//!   sketch/Blink.ino.cpp                           merged, then patched, source
//!   sketch/<additional files>                      copied .c/.cpp/.h files
//!   preproc/ctags_target_for_gcc_minus_e.cpp       preprocessed sketch lines
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::discovery::discover_includes;
use crate::builder::patcher::patch_source;
use crate::builder::toolchain::{Preprocessor, TagLister};
use crate::core::catalog::{library_folders, LibraryCatalog};
use crate::core::library::is_source_file;
use crate::core::platform::PlatformContext;
use crate::core::sketch::Sketch;
use crate::ctags::{prototypes_from_tags, Prototype};
use crate::resolver::ImportedSet;
use crate::util::diagnostic::{ArchitectureWarning, MultipleLibrariesWarning};
use crate::util::fs::{copy_file, relative_path, write_string};

/// Folder under the build path holding the merged sketch.
pub const SKETCH_BUILD_FOLDER: &str = "sketch";

/// Folder under the build path holding preprocessor output.
pub const PREPROC_FOLDER: &str = "preproc";

/// File ctags is run on.
pub const CTAGS_TARGET: &str = "ctags_target_for_gcc_minus_e.cpp";

/// Options for the preprocess command.
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Sketch folder or main file
    pub sketch: PathBuf,

    /// Build folder
    pub build_path: PathBuf,

    /// Libraries folders, highest priority first. The platforms' own
    /// `libraries` folders are appended.
    pub library_folders: Vec<PathBuf>,

    /// Core and variant include directories
    pub include_dirs: Vec<PathBuf>,

    pub platforms: PlatformContext,
}

/// Outcome of preprocessing a sketch.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// The patched sketch source
    pub source: String,

    /// Where the patched source was saved
    pub output: PathBuf,

    pub imported: ImportedSet,

    /// Include path: core directories, then imported library folders
    pub include_dirs: Vec<PathBuf>,

    pub prototypes: Vec<Prototype>,

    pub insertion_line: Option<usize>,
}

/// Preprocess a sketch into a compilable C++ file.
pub fn preprocess(
    opts: &PreprocessOptions,
    preprocessor: &dyn Preprocessor,
    tag_lister: &dyn TagLister,
) -> Result<PreprocessResult> {
    let sketch = Sketch::load(&opts.sketch)?;
    tracing::debug!("preprocessing sketch {}", sketch.main_file.path.display());

    let merged = sketch.merge();
    let sketch_dir = opts.build_path.join(SKETCH_BUILD_FOLDER);
    let output = sketch_dir.join(format!("{}.cpp", sketch.name()));
    write_string(&output, &merged.source)?;

    let mut sources = vec![output.clone()];
    for file in &sketch.additional_files {
        let copy = sketch_dir.join(relative_path(&sketch.folder, &file.path));
        copy_file(&file.path, &copy)?;
        if is_source_file(&copy) {
            sources.push(copy);
        }
    }

    let folders = library_folders(&opts.library_folders, &opts.platforms);
    let catalog = LibraryCatalog::load(&folders)?;
    let index = catalog.header_index()?;
    tracing::debug!(
        "{} libraries in {} folders, {} headers",
        catalog.len(),
        folders.len(),
        index.len()
    );

    let discovery = discover_includes(
        preprocessor,
        &index,
        &opts.platforms,
        opts.include_dirs.iter().cloned(),
        sources,
    )?;
    report_resolutions(&discovery.imported, &opts.platforms);

    let preprocessed = preprocessor
        .preprocess(&output, &discovery.include_dirs)
        .context("failed to preprocess the sketch for prototype generation")?;
    let ctags_target = opts.build_path.join(PREPROC_FOLDER).join(CTAGS_TARGET);
    write_string(&ctags_target, &sketch.filter_source(&preprocessed))?;

    let raw_tags = tag_lister.list(&ctags_target)?;
    let (prototypes, insertion_line) =
        prototypes_from_tags(&raw_tags, Some(&sketch.main_file.path));
    tracing::debug!(
        "{} prototypes, insertion line {:?}",
        prototypes.len(),
        insertion_line
    );

    let source = patch_source(
        &merged.source,
        &prototypes,
        insertion_line,
        merged.line_offset,
    );
    write_string(&output, &source)?;

    Ok(PreprocessResult {
        source,
        output,
        imported: discovery.imported,
        include_dirs: discovery.include_dirs,
        prototypes,
        insertion_line,
    })
}

/// Log the libraries used and anything suspicious about the choice.
pub fn report_resolutions(imported: &ImportedSet, platforms: &PlatformContext) {
    for library in imported.libraries() {
        if library.legacy {
            tracing::info!(
                "Using library {} in folder: {} (legacy)",
                library.name,
                library.folder.display()
            );
        } else {
            tracing::info!(
                "Using library {} at version {} in folder: {}",
                library.name,
                library.version,
                library.folder.display()
            );
        }
    }

    for (header, resolution) in imported.resolutions() {
        if resolution.not_used.is_empty() {
            continue;
        }
        let warning = MultipleLibrariesWarning {
            header: header.to_string(),
            used: resolution.library.folder.clone(),
            not_used: resolution.not_used.iter().map(|l| l.folder.clone()).collect(),
        };
        tracing::warn!("{}", warning.report());
    }

    for library in imported.libraries() {
        if !library.supports_architecture(platforms.target_id()) {
            let warning = ArchitectureWarning {
                library: library.name.clone(),
                architectures: library.architectures.to_string(),
                target: platforms.target_id().to_string(),
            };
            tracing::warn!("{}", warning);
        }
    }
}

/// Default build folder for a sketch: `<sketch folder>/build`.
pub fn default_build_path(sketch: &Path) -> PathBuf {
    let folder = if sketch.is_dir() {
        sketch.to_path_buf()
    } else {
        sketch.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    folder.join("build")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Platform;
    use crate::test_support::{tag_line, FakePreprocessor, FakeTagLister, LibraryFixture};
    use std::fs;
    use tempfile::TempDir;

    struct Setup {
        _tmp: TempDir,
        opts: PreprocessOptions,
        main_file: PathBuf,
    }

    fn setup(main_source: &str) -> Setup {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();

        let platform_dir = root.join("hardware").join("avr");
        let core = platform_dir.join("cores").join("arduino");
        fs::create_dir_all(&core).unwrap();
        fs::write(core.join("Arduino.h"), "").unwrap();
        LibraryFixture::new("SPI")
            .properties("name=SPI\nversion=1.0\nauthor=A\nmaintainer=A\narchitectures=avr\n")
            .header("SPI.h")
            .create(&platform_dir.join("libraries"));

        let user_libs = root.join("libraries");
        LibraryFixture::new("Servo")
            .properties("name=Servo\nversion=1.1.8\nauthor=A\nmaintainer=A\narchitectures=sam\n")
            .header_with("Servo.h", "#include <SPI.h>\n")
            .source("Servo.cpp", "#include \"Servo.h\"\n")
            .create(&user_libs);

        let sketch_dir = root.join("Blink");
        fs::create_dir_all(sketch_dir.join("src")).unwrap();
        let main_file = sketch_dir.join("Blink.ino");
        fs::write(&main_file, main_source).unwrap();
        fs::write(sketch_dir.join("src").join("util.h"), "int twice(int);\n").unwrap();
        fs::write(
            sketch_dir.join("src").join("util.cpp"),
            "#include \"util.h\"\nint twice(int x) { return 2 * x; }\n",
        )
        .unwrap();

        let opts = PreprocessOptions {
            sketch: sketch_dir.clone(),
            build_path: root.join("build"),
            library_folders: vec![user_libs],
            include_dirs: vec![core],
            platforms: PlatformContext::single(Platform::new("avr", platform_dir)),
        };

        Setup {
            _tmp: tmp,
            opts,
            main_file,
        }
    }

    #[test]
    fn test_preprocess_discovers_libraries_and_adds_prototypes() {
        let s = setup("#include <Servo.h>\n\nvoid setup() {\n  blink();\n}\n\nvoid blink() {\n}\n");
        let main = s.main_file.display().to_string();
        let tags = FakeTagLister::new(format!(
            "{}\n{}\n",
            tag_line("setup", &main, "function", 3, &["signature:()", "returntype:void"], "void setup() {"),
            tag_line("blink", &main, "function", 7, &["signature:()", "returntype:void"], "void blink() {"),
        ));

        let result = preprocess(&s.opts, &FakePreprocessor::new(), &tags).unwrap();

        let names: Vec<_> = result.imported.libraries().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Servo", "SPI"]);
        assert_eq!(result.include_dirs.len(), 3);
        assert_eq!(result.insertion_line, Some(3));
        assert_eq!(result.prototypes.len(), 2);

        let expected = format!(
            "#include <Arduino.h>\n#line 1 \"{}\"\n#include <Servo.h>\n\n\
             void setup();\nvoid blink();\n#line 3\nvoid setup() {{\n",
            main
        );
        assert!(result.source.starts_with(&expected), "{}", result.source);

        let saved = fs::read_to_string(&result.output).unwrap();
        assert_eq!(saved, result.source);
        assert!(result.output.ends_with("build/sketch/Blink.ino.cpp"));

        let build = &s.opts.build_path;
        assert!(build.join("sketch").join("src").join("util.cpp").is_file());
        let ctags_target = build.join(PREPROC_FOLDER).join(CTAGS_TARGET);
        assert_eq!(tags.listed(), vec![ctags_target.clone()]);
        let filtered = fs::read_to_string(ctags_target).unwrap();
        assert!(filtered.starts_with("#line 1"));
        assert!(!filtered.contains("# 1 "));
    }

    #[test]
    fn test_preprocess_without_functions_leaves_source() {
        let s = setup("#include <Arduino.h>\nint x = 1;\n");
        let result = preprocess(&s.opts, &FakePreprocessor::new(), &FakeTagLister::new("")).unwrap();

        assert!(result.imported.is_empty());
        assert!(result.insertion_line.is_none());
        assert_eq!(
            result.source,
            format!(
                "#line 1 \"{}\"\n#include <Arduino.h>\nint x = 1;\n\n",
                s.main_file.display()
            )
        );
    }

    #[test]
    fn test_preprocess_fails_on_unknown_header() {
        let s = setup("#include <Nope.h>\nvoid setup() {}\n");
        let err = preprocess(&s.opts, &FakePreprocessor::new(), &FakeTagLister::new("")).unwrap_err();
        assert!(err.to_string().contains("fatal error: Nope.h: No such file or directory"));
    }

    #[test]
    fn test_default_build_path() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(default_build_path(tmp.path()), tmp.path().join("build"));
        assert_eq!(
            default_build_path(&tmp.path().join("Blink.ino")),
            tmp.path().join("build")
        );
    }
}
