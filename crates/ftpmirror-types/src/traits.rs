//! The transport contract consumed by the mirror engine
//!
//! The engine never talks to a socket. It drives a [`RemoteTransport`], which the FTP client
//! implements for real servers and the test utilities implement in memory.

use crate::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Outcome of a "change directory" request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryChange {
    /// The working directory is now the requested child
    Entered,
    /// The requested directory does not exist (or is not a directory)
    NotFound,
}

/// Callback invoked once per block written by [`RemoteTransport::store_file`]
pub type BlockCallback<'a> = dyn FnMut(usize) + Send + 'a;

/// Read from `source` until `block` is full or the source is exhausted.
///
/// Returns the number of bytes read; zero means end of input.
pub async fn fill_block<R>(source: &mut R, block: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < block.len() {
        let n = source.read(&mut block[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Sequential, stateful file transfer session.
///
/// Every method completes its request/response exchange before returning; callers never
/// issue a second request while one is outstanding.
#[async_trait]
pub trait RemoteTransport: Send {
    /// Enter the child directory `name` of the current working directory.
    ///
    /// A missing directory is reported as [`DirectoryChange::NotFound`], not as an error.
    async fn change_directory(&mut self, name: &str) -> Result<DirectoryChange>;

    /// Move the working directory to its parent
    async fn parent_directory(&mut self) -> Result<()>;

    /// Create the child directory `name` of the current working directory
    async fn make_directory(&mut self, name: &str) -> Result<()>;

    /// List entry names in the current working directory, in server order
    async fn list_names(&mut self) -> Result<Vec<String>>;

    /// Send a raw command line and return the full response text on success
    async fn send_command(&mut self, command: &str) -> Result<String>;

    /// Upload `source` as `remote_name` in the current working directory.
    ///
    /// Data is read and sent in blocks of at most `block_size` bytes; `on_block` is called with
    /// the length of every block sent. Returns the number of bytes stored.
    async fn store_file(
        &mut self,
        remote_name: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        block_size: usize,
        on_block: &mut BlockCallback<'_>,
    ) -> Result<u64>;

    /// Delete the file at `path`, relative to the current working directory
    async fn delete_file(&mut self, path: &str) -> Result<()>;

    /// End the session politely
    async fn quit(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fill_block_splits_input() {
        let mut source: &[u8] = b"0123456789";
        let mut block = [0u8; 4];
        let mut sizes = Vec::new();
        loop {
            let n = fill_block(&mut source, &mut block).await.unwrap();
            if n == 0 {
                break;
            }
            sizes.push(n);
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }
}
