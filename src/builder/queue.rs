//! Work queue of source files awaiting include discovery.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::util::fs::normalize_path;

/// FIFO of source files. A path is accepted at most once, even after it
/// has been popped.
#[derive(Debug, Clone, Default)]
pub struct SourceQueue {
    pending: VecDeque<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl SourceQueue {
    pub fn new() -> Self {
        SourceQueue::default()
    }

    /// Queue `path`. Returns `false` if it was queued before.
    pub fn push(&mut self, path: impl AsRef<Path>) -> bool {
        let path = normalize_path(path.as_ref());
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.pending.push_back(path);
        true
    }

    pub fn pop(&mut self) -> Option<PathBuf> {
        self.pending.pop_front()
    }

    /// Number of files still waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<P: AsRef<Path>> Extend<P> for SourceQueue {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_queue_is_fifo_and_suppresses_duplicates() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.cpp");
        let b = tmp.path().join("b.cpp");
        fs::write(&a, "").unwrap();
        fs::write(&b, "").unwrap();

        let mut queue = SourceQueue::new();
        assert!(queue.push(&a));
        assert!(queue.push(&b));
        assert!(!queue.push(&a));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some(normalize_path(&a)));
        assert!(!queue.push(&a));
        assert_eq!(queue.pop(), Some(normalize_path(&b)));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_equivalent_paths_are_one_entry() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("src");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("x.c"), "").unwrap();

        let mut queue = SourceQueue::new();
        queue.extend([dir.join("x.c"), dir.join("..").join("src").join("x.c")]);
        assert_eq!(queue.len(), 1);
    }
}
