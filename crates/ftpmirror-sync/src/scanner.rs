//! Local tree scanning
//!
//! Produces the list of directories and files that take part in a run, grouped by directory
//! and sorted so that consecutive directories share as long a prefix as possible.

use crate::filter::{normalize, PathFilter};
use ftpmirror_types::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A directory (relative, forward-slash form) and the files directly inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeEntry {
    /// Directory path relative to the local root; empty for the root itself
    pub directory: String,
    /// File names directly inside the directory, sorted
    pub files: BTreeSet<String>,
}

impl FileTreeEntry {
    /// Directory path split into segments
    pub fn segments(&self) -> Vec<String> {
        split_segments(&self.directory)
    }

    /// Relative path of one of this entry's files
    pub fn file_path(&self, name: &str) -> String {
        if self.directory.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.directory, name)
        }
    }
}

/// Split a canonical relative path into its segments
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds the filtered, sorted local tree
#[derive(Debug)]
pub struct LocalTreeScanner<'a> {
    root: PathBuf,
    filter: &'a PathFilter,
}

impl<'a> LocalTreeScanner<'a> {
    /// Create a scanner over `root`
    pub fn new<P: AsRef<Path>>(root: P, filter: &'a PathFilter) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            filter,
        }
    }

    /// Scan either the explicit file list or, when `None`, the whole local root
    pub fn scan(&self, explicit: Option<&[String]>) -> Result<Vec<FileTreeEntry>> {
        let tree = match explicit {
            Some(files) => self.scan_explicit(files)?,
            None => self.walk()?,
        };

        let entries: Vec<FileTreeEntry> = tree
            .into_iter()
            .map(|(segments, files)| FileTreeEntry {
                directory: segments.join("/"),
                files,
            })
            .collect();

        info!(
            "Scanned {} files in {} directories",
            entries.iter().map(|e| e.files.len()).sum::<usize>(),
            entries.len()
        );
        Ok(entries)
    }

    /// Group explicitly named files by parent directory, dropping excluded ones
    fn scan_explicit(&self, files: &[String]) -> Result<BTreeMap<Vec<String>, BTreeSet<String>>> {
        let mut tree: BTreeMap<Vec<String>, BTreeSet<String>> = BTreeMap::new();

        for file in files {
            let path = normalize(file);
            if path.is_empty() || Path::new(file).is_absolute() {
                return Err(Error::config(format!(
                    "'{}' is not a path relative to the local root",
                    file
                )));
            }

            let mut segments = split_segments(&path);
            if segments.iter().any(|s| s == "." || s == "..") {
                return Err(Error::config(format!(
                    "'{}' must not leave the local root",
                    file
                )));
            }

            if self.filter.is_excluded_explicit(&path) {
                info!("excluding {}", path);
                continue;
            }

            let local = self.root.join(&path);
            let metadata = std::fs::metadata(&local).map_err(|e| Error::local_file(&local, &e))?;
            if !metadata.is_file() {
                return Err(Error::LocalFile {
                    path: local,
                    message: "not a regular file".to_string(),
                });
            }

            // split_segments never yields an empty list for a non-empty path
            let name = segments.pop().unwrap_or_default();
            tree.entry(segments).or_default().insert(name);
        }

        Ok(tree)
    }

    /// Walk the local root, pruning excluded directories before descending
    fn walk(&self) -> Result<BTreeMap<Vec<String>, BTreeSet<String>>> {
        let mut tree: BTreeMap<Vec<String>, BTreeSet<String>> = BTreeMap::new();
        let root = self.root.as_path();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = relative_path(root, entry.path());
                if self.filter.is_excluded(&relative) {
                    info!("excluding {}", relative);
                    false
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::LocalFile {
                    path,
                    message: e.to_string(),
                }
            })?;

            let file_type = entry.file_type();
            let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let mut segments = split_segments(&relative_path(root, entry.path()));
            let Some(name) = segments.pop() else {
                continue;
            };
            debug!("Found local file {}/{}", segments.join("/"), name);
            tree.entry(segments).or_default().insert(name);
        }

        Ok(tree)
    }
}

/// Canonical relative path of `path` below `root`
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize(&relative.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_tree(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, file.as_bytes()).unwrap();
        }
    }

    fn directories(entries: &[FileTreeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.directory.as_str()).collect()
    }

    #[test]
    fn test_walk_groups_and_sorts_by_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(
            temp_dir.path(),
            &["index.html", "b/y.txt", "a/x.txt", "a/deep/z.txt", "a-b/w.txt"],
        );
        let filter = PathFilter::default();

        let entries = LocalTreeScanner::new(temp_dir.path(), &filter)
            .scan(None)
            .unwrap();

        assert_eq!(directories(&entries), vec!["", "a", "a/deep", "a-b", "b"]);
        assert!(entries[0].files.contains("index.html"));
        assert_eq!(entries[2].file_path("z.txt"), "a/deep/z.txt");
    }

    #[test]
    fn test_walk_skips_directories_without_files() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(temp_dir.path(), &["a/x.txt"]);
        fs::create_dir_all(temp_dir.path().join("empty/nested")).unwrap();
        let filter = PathFilter::default();

        let entries = LocalTreeScanner::new(temp_dir.path(), &filter)
            .scan(None)
            .unwrap();

        assert_eq!(directories(&entries), vec!["a"]);
    }

    #[test]
    fn test_walk_prunes_excluded_directories() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(
            temp_dir.path(),
            &["keep/a.txt", "node_modules/pkg/index.js", "node_modules/b.js", "x.log"],
        );
        let filter = PathFilter::new(&["node_modules", r".*\.log"], &[]).unwrap();

        let entries = LocalTreeScanner::new(temp_dir.path(), &filter)
            .scan(None)
            .unwrap();

        assert_eq!(directories(&entries), vec!["keep"]);
    }

    #[test]
    fn test_explicit_files_are_grouped_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(
            temp_dir.path(),
            &["css/site.css", "index.html", "css/print.css"],
        );
        let filter = PathFilter::new(&["build"], &[]).unwrap();
        let files = vec![
            "css/site.css".to_string(),
            "./index.html".to_string(),
            "css/print.css".to_string(),
            "build/out.js".to_string(),
        ];

        let entries = LocalTreeScanner::new(temp_dir.path(), &filter)
            .scan(Some(&files))
            .unwrap();

        assert_eq!(directories(&entries), vec!["", "css"]);
        let css: Vec<&String> = entries[1].files.iter().collect();
        assert_eq!(css, vec!["print.css", "site.css"]);
    }

    #[test]
    fn test_explicit_files_must_stay_inside_root() {
        let temp_dir = TempDir::new().unwrap();
        let filter = PathFilter::default();
        let scanner = LocalTreeScanner::new(temp_dir.path(), &filter);

        assert!(scanner.scan(Some(&["../secret".to_string()])).is_err());
        assert!(scanner.scan(Some(&[String::new()])).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        create_tree(temp_dir.path(), &["a.txt", "dir/b.txt"]);
        let filter = PathFilter::default();
        let scanner = LocalTreeScanner::new(temp_dir.path(), &filter);

        let err = scanner
            .scan(Some(&["a.txt".to_string(), "nope.txt".to_string()]))
            .unwrap_err();
        assert!(matches!(err, Error::LocalFile { .. }));
        assert!(scanner.scan(Some(&["dir".to_string()])).is_err());
    }

    #[test]
    fn test_split_segments() {
        assert!(split_segments("").is_empty());
        assert_eq!(split_segments("a/b/c"), vec!["a", "b", "c"]);
    }
}
