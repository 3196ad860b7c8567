//! Local tree builders

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary local directory tree, removed on drop
#[derive(Debug)]
pub struct LocalTree {
    dir: TempDir,
}

impl LocalTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Root of the tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `relative` with `content` and set its modification time to `modified`
    pub fn file(&self, relative: &str, content: &[u8], modified: i64) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write test file");
        self.touch(relative, modified);
        path
    }

    /// Set the modification time of `relative`
    pub fn touch(&self, relative: &str, modified: i64) {
        filetime::set_file_mtime(
            self.dir.path().join(relative),
            FileTime::from_unix_time(modified, 0),
        )
        .expect("Failed to set modification time");
    }

    /// Create an empty directory
    pub fn dir(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    /// Remove a file
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.dir.path().join(relative)).expect("Failed to remove test file");
    }
}

impl Default for LocalTree {
    fn default() -> Self {
        Self::new()
    }
}
