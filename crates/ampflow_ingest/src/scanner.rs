//! Input file discovery.
//!
//! Walks a directory tree depth-first and yields the files matching the
//! configured extension. Unreadable subtrees are logged and skipped; the
//! walk continues. Every call to [`FileScanner::scan`] starts fresh.

use crate::error::{IngestError, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Recursive scanner for measurement-log files.
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    extension: String,
}

impl FileScanner {
    /// Scan `root` for the default `csv` extension.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: ampflow_protocol::defaults::DEFAULT_FILE_EXTENSION.to_string(),
        }
    }

    /// Match a different extension (no leading dot, case-insensitive).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Start a fresh lazy walk.
    ///
    /// Fails only if the root does not exist; per-subtree read errors are
    /// logged, counted on the iterator, and skipped.
    pub fn scan(&self) -> Result<ScanIter> {
        if !self.root.exists() {
            return Err(IngestError::RootNotFound(self.root.clone()));
        }

        // gitignore semantics make no sense for measurement dumps; walk
        // everything, hidden files included, without following symlinks
        let walk = WalkBuilder::new(&self.root)
            .hidden(false)
            .follow_links(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build();

        Ok(ScanIter {
            walk,
            extension: self.extension.clone(),
            errors: 0,
        })
    }

    /// Walk to completion and return the matches, sorted for deterministic
    /// scheduling.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self.scan()?.collect();
        files.sort();
        Ok(files)
    }
}

/// Lazy walk over matching files.
pub struct ScanIter {
    walk: ignore::Walk,
    extension: String,
    errors: usize,
}

impl ScanIter {
    /// Number of unreadable entries skipped so far.
    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl Iterator for ScanIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.errors += 1;
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            if matches_extension(&path, &self.extension) {
                return Some(path);
            }
        }
    }
}

fn matches_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "Time,BarCode\n").unwrap();
    }

    #[test]
    fn discovers_matching_files_across_subdirectories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.csv");
        touch(tmp.path(), "sub/b.csv");
        touch(tmp.path(), "sub/deeper/c.CSV");
        touch(tmp.path(), "sub/ignored.txt");
        touch(tmp.path(), "notes.json");

        let files = FileScanner::new(tmp.path()).collect_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();

        assert_eq!(names, vec!["a.csv", "b.csv", "c.CSV"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let scanner = FileScanner::new("/nonexistent/ampflow/input");
        assert!(matches!(
            scanner.scan(),
            Err(IngestError::RootNotFound(_))
        ));
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(FileScanner::new(tmp.path())
            .collect_files()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn custom_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.tsv");
        touch(tmp.path(), "b.csv");

        let files = FileScanner::new(tmp.path())
            .with_extension("tsv")
            .collect_files()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.tsv"));
    }

    #[test]
    fn rescan_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.csv");

        let scanner = FileScanner::new(tmp.path());
        assert_eq!(scanner.collect_files().unwrap().len(), 1);
        assert_eq!(scanner.collect_files().unwrap().len(), 1);
    }
}
