//! Incremental remote directory navigation
//!
//! The navigator remembers where the remote working directory is, relative to the document
//! root, and moves between directories with the fewest commands: one "move to parent" per
//! segment leaving the common prefix, one "change directory" per segment entering the target.
//! Missing target directories are created on the way down.

use ftpmirror_types::{DirectoryChange, Error, RemoteTransport, Result};
use tracing::debug;

/// Number of leading segments shared by `a` and `b`
pub fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Tracks the remote working directory as a list of segments below the document root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteNavigator {
    current: Vec<String>,
    directory_changes: u64,
    parent_moves: u64,
    directories_created: u64,
}

impl RemoteNavigator {
    /// Navigator positioned at the document root
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the present working directory to be the document root
    pub fn mark_root(&mut self) {
        self.current.clear();
    }

    /// Current position, relative to the document root
    pub fn current(&self) -> &[String] {
        &self.current
    }

    /// "Change directory" commands issued so far
    pub fn directory_changes(&self) -> u64 {
        self.directory_changes
    }

    /// "Move to parent" commands issued so far
    pub fn parent_moves(&self) -> u64 {
        self.parent_moves
    }

    /// Directories created so far
    pub fn directories_created(&self) -> u64 {
        self.directories_created
    }

    /// Move the remote working directory to `target`, creating missing directories.
    ///
    /// On error the navigator stays consistent with the directories actually entered.
    pub async fn goto_path<T>(&mut self, transport: &mut T, target: &[String]) -> Result<()>
    where
        T: RemoteTransport + ?Sized,
    {
        let shared = common_prefix_len(&self.current, target);

        while self.current.len() > shared {
            transport.parent_directory().await?;
            self.parent_moves += 1;
            self.current.pop();
        }

        for segment in &target[shared..] {
            self.enter(transport, segment).await?;
        }

        debug!("Remote working directory is /{}", self.current.join("/"));
        Ok(())
    }

    async fn enter<T>(&mut self, transport: &mut T, segment: &str) -> Result<()>
    where
        T: RemoteTransport + ?Sized,
    {
        self.directory_changes += 1;
        if transport.change_directory(segment).await? == DirectoryChange::NotFound {
            debug!("Creating remote directory {}", segment);
            transport.make_directory(segment).await?;
            self.directories_created += 1;

            self.directory_changes += 1;
            if transport.change_directory(segment).await? == DirectoryChange::NotFound {
                return Err(Error::protocol(format!(
                    "cannot enter directory {} after creating it",
                    segment
                )));
            }
        }
        self.current.push(segment.to_string());
        Ok(())
    }
}
