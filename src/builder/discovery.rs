//! Include discovery.
//!
//! Which libraries a sketch needs is found by asking the compiler, not by
//! scanning `#include` lines: includes may sit behind `#if`s that only
//! the preprocessor can evaluate. Each queued file is preprocessed; when
//! that fails on a missing header, a library providing it is imported,
//! its folder goes on the include path, its sources join the queue, and
//! the same file is tried again.
//!
//! Every retry either finishes the file or grows the imported set or the
//! include path. Both are bounded by the catalog, so discovery always
//! terminates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::queue::SourceQueue;
use crate::builder::toolchain::{DiscoveryOutcome, Preprocessor};
use crate::core::catalog::HeaderIndex;
use crate::core::platform::PlatformContext;
use crate::resolver::{resolve_library, ImportedSet, ResolveError};

/// Mutable state of one sketch's include discovery.
///
/// Sessions share nothing, so independent sketches can be resolved
/// concurrently against the same catalog.
#[derive(Debug)]
pub struct ResolutionSession<'a> {
    index: &'a HeaderIndex,
    platforms: &'a PlatformContext,
    imported: ImportedSet,
    include_dirs: Vec<PathBuf>,
    queue: SourceQueue,
}

impl<'a> ResolutionSession<'a> {
    /// Start a session with the core include directories already known.
    pub fn new(
        index: &'a HeaderIndex,
        platforms: &'a PlatformContext,
        include_dirs: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        ResolutionSession {
            index,
            platforms,
            imported: ImportedSet::new(),
            include_dirs: include_dirs.into_iter().collect(),
            queue: SourceQueue::new(),
        }
    }

    /// Queue a source file for discovery.
    pub fn enqueue(&mut self, path: impl AsRef<Path>) -> bool {
        self.queue.push(path)
    }

    /// Process the queue until it is empty.
    pub fn run(&mut self, preprocessor: &dyn Preprocessor) -> Result<()> {
        while let Some(file) = self.queue.pop() {
            self.scan_until_done(preprocessor, &file)?;
        }
        Ok(())
    }

    pub fn imported(&self) -> &ImportedSet {
        &self.imported
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Finish the session, keeping its results.
    pub fn finish(self) -> Discovery {
        Discovery {
            imported: self.imported,
            include_dirs: self.include_dirs,
        }
    }

    fn scan_until_done(&mut self, preprocessor: &dyn Preprocessor, file: &Path) -> Result<()> {
        loop {
            let header = match preprocessor.discover(file, &self.include_dirs)? {
                DiscoveryOutcome::Clean => return Ok(()),
                DiscoveryOutcome::Failed(output) => {
                    return Err(ResolveError::Compiler {
                        source_file: file.to_path_buf(),
                        output,
                    }
                    .into())
                }
                DiscoveryOutcome::MissingHeader(header) => header,
            };

            tracing::debug!("{}: missing header `{}`", file.display(), header);

            let candidates = self.index.candidates(&header);
            let Some(resolution) =
                resolve_library(&header, candidates, &self.imported, self.platforms)
            else {
                return Err(self.unresolved(preprocessor, file, header));
            };

            let library = Arc::clone(&resolution.library);
            let mut progressed = false;

            if !self.imported.contains(&library) {
                library.ensure_importable().map_err(ResolveError::from)?;
                tracing::debug!(
                    "importing `{}` from {} for `{}`",
                    library.name,
                    library.folder.display(),
                    header
                );
                self.queue.extend(library.source_files()?);
                self.imported.insert(Arc::clone(&library));
                progressed = true;
            }

            if !self.include_dirs.contains(&library.src_folder) {
                self.include_dirs.push(library.src_folder.clone());
                progressed = true;
            }

            self.imported.record(header.clone(), resolution);

            if !progressed {
                // The chosen library is already fully available yet the
                // header is still missing: no retry can succeed.
                return Err(self.unresolved(preprocessor, file, header));
            }
        }
    }

    fn unresolved(
        &self,
        preprocessor: &dyn Preprocessor,
        file: &Path,
        header: String,
    ) -> anyhow::Error {
        match preprocessor.diagnose(file, &self.include_dirs) {
            Ok(output) => ResolveError::UnresolvedHeader {
                header,
                source_file: file.to_path_buf(),
                output,
            }
            .into(),
            Err(err) => err.context(format!("failed to diagnose missing header `{}`", header)),
        }
    }
}

/// Outcome of include discovery.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub imported: ImportedSet,
    /// Final include path: core directories, then library source folders.
    pub include_dirs: Vec<PathBuf>,
}

/// Discover the libraries needed by `sources`.
pub fn discover_includes(
    preprocessor: &dyn Preprocessor,
    index: &HeaderIndex,
    platforms: &PlatformContext,
    include_dirs: impl IntoIterator<Item = PathBuf>,
    sources: impl IntoIterator<Item = PathBuf>,
) -> Result<Discovery> {
    let mut session = ResolutionSession::new(index, platforms, include_dirs);
    for source in sources {
        session.enqueue(source);
    }
    session.run(preprocessor)?;
    Ok(session.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::LibraryCatalog;
    use crate::core::library::Library;
    use crate::core::platform::Platform;
    use crate::test_support::{FakePreprocessor, LibraryFixture};
    use std::fs;
    use tempfile::TempDir;

    struct Setup {
        _tmp: TempDir,
        sketch: PathBuf,
        core: PathBuf,
        catalog: LibraryCatalog,
        platforms: PlatformContext,
    }

    fn setup(sketch_source: &str) -> Setup {
        let tmp = TempDir::new().unwrap();
        let libs = tmp.path().join("libraries");
        let core = tmp.path().join("hw").join("avr").join("cores").join("arduino");
        fs::create_dir_all(&core).unwrap();
        fs::write(core.join("Arduino.h"), "").unwrap();

        LibraryFixture::new("Servo")
            .recursive()
            .header_with("Servo.h", "#include <SPI.h>\n")
            .source("Servo.cpp", "#include \"Servo.h\"\n")
            .create(&libs);
        LibraryFixture::new("SPI")
            .header("SPI.h")
            .source("SPI.cpp", "#include <SPI.h>\n")
            .create(&libs);
        LibraryFixture::new("Wire")
            .header("Wire.h")
            .source("Wire.cpp", "#include <Wire.h>\n#include <Arduino.h>\n")
            .create(&libs);
        LibraryFixture::new("Unused").header("Unused.h").create(&libs);

        let sketch = tmp.path().join("sketch.cpp");
        fs::write(&sketch, sketch_source).unwrap();

        let catalog = LibraryCatalog::load(&[libs]).unwrap();
        let platforms = PlatformContext::single(Platform::new("avr", tmp.path().join("hw").join("avr")));

        Setup {
            _tmp: tmp,
            sketch,
            core,
            catalog,
            platforms,
        }
    }

    fn imported_names(discovery: &Discovery) -> Vec<String> {
        let mut names: Vec<_> = discovery
            .imported
            .libraries()
            .iter()
            .map(|l| l.name.clone())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_discovers_transitive_libraries() {
        let s = setup("#include <Arduino.h>\n#include <Servo.h>\n#include <Wire.h>\n");
        let index = s.catalog.header_index().unwrap();
        let pp = FakePreprocessor::new();

        let discovery = discover_includes(
            &pp,
            &index,
            &s.platforms,
            [s.core.clone()],
            [s.sketch.clone()],
        )
        .unwrap();

        assert_eq!(imported_names(&discovery), vec!["SPI", "Servo", "Wire"]);
        assert_eq!(discovery.include_dirs[0], s.core);
        assert_eq!(discovery.include_dirs.len(), 4);
        assert!(discovery.imported.resolution("Servo.h").is_some());
        assert!(discovery.imported.resolution("Unused.h").is_none());
    }

    #[test]
    fn test_discovery_is_independent_of_include_order() {
        let forward = setup("#include <Servo.h>\n#include <Wire.h>\n");
        let backward = setup("#include <Wire.h>\n#include <SPI.h>\n#include <Servo.h>\n");

        for s in [forward, backward] {
            let index = s.catalog.header_index().unwrap();
            let discovery = discover_includes(
                &FakePreprocessor::new(),
                &index,
                &s.platforms,
                [s.core.clone()],
                [s.sketch.clone()],
            )
            .unwrap();
            assert_eq!(imported_names(&discovery), vec!["SPI", "Servo", "Wire"]);
        }
    }

    #[test]
    fn test_unresolved_header_surfaces_compiler_text() {
        let s = setup("#include <Servo.h>\n#include <Missing.h>\n");
        let index = s.catalog.header_index().unwrap();

        let err = discover_includes(
            &FakePreprocessor::new(),
            &index,
            &s.platforms,
            [s.core.clone()],
            [s.sketch.clone()],
        )
        .unwrap_err();

        let resolve_err = err.downcast_ref::<ResolveError>().unwrap();
        assert!(matches!(
            resolve_err,
            ResolveError::UnresolvedHeader { header, .. } if header == "Missing.h"
        ));
        assert!(err
            .to_string()
            .contains("fatal error: Missing.h: No such file or directory"));
    }

    #[test]
    fn test_header_that_never_appears_does_not_loop() {
        let s = setup("#include <Ghost.h>\n");
        let mut index = s.catalog.header_index().unwrap();
        let wire = Arc::clone(s.catalog.find("Wire").unwrap());
        index.insert("Ghost.h", wire);

        let pp = FakePreprocessor::new();
        let err = discover_includes(
            &pp,
            &index,
            &s.platforms,
            [s.core.clone()],
            [s.sketch.clone()],
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::UnresolvedHeader { .. })
        ));
        assert_eq!(pp.discover_calls(&s.sketch), 2);
    }

    #[test]
    fn test_malformed_library_fails_on_import() {
        let s = setup("#include <Broken.h>\n");
        let broken_dir = s.sketch.parent().unwrap().join("extra").join("Broken");
        LibraryFixture::new("Broken")
            .properties("name=Broken\nversion=1.0\n")
            .header("Broken.h")
            .create(broken_dir.parent().unwrap());

        let broken = Library::load(&broken_dir).unwrap();
        let mut index = s.catalog.header_index().unwrap();
        index.insert("Broken.h", Arc::new(broken));

        let err = discover_includes(
            &FakePreprocessor::new(),
            &index,
            &s.platforms,
            [s.core.clone()],
            [s.sketch.clone()],
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::Library(_))
        ));
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn test_other_compiler_failures_are_verbatim() {
        let s = setup("#include <Wire.h>\n");
        let index = s.catalog.header_index().unwrap();
        let pp = FakePreprocessor::new().fail_on(&s.sketch, "sketch.cpp:1:2: error: #error boom\n");

        let err = discover_includes(
            &pp,
            &index,
            &s.platforms,
            [s.core.clone()],
            [s.sketch.clone()],
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "sketch.cpp:1:2: error: #error boom\n");
    }

    #[test]
    fn test_session_reports_include_dirs_in_import_order() {
        let s = setup("#include <Wire.h>\n#include <Servo.h>\n");
        let index = s.catalog.header_index().unwrap();

        let mut session = ResolutionSession::new(&index, &s.platforms, [s.core.clone()]);
        assert!(session.enqueue(&s.sketch));
        assert!(!session.enqueue(&s.sketch));
        session.run(&FakePreprocessor::new()).unwrap();

        let wire = s.catalog.find("Wire").unwrap();
        let servo = s.catalog.find("Servo").unwrap();
        assert_eq!(session.include_dirs()[1], wire.src_folder);
        assert_eq!(session.include_dirs()[2], servo.src_folder);
        assert_eq!(session.imported().len(), 3);
    }
}
