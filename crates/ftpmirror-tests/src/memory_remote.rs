//! In-memory FTP server model
//!
//! [`MemoryRemote`] holds a directory tree and a log of every command received. Any number of
//! [`MemoryTransport`] handles can be connected to it; they share the tree, so a test can run
//! the engine twice against the same remote and inspect the result in between.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ftpmirror_types::{
    fill_block, BlockCallback, DirectoryChange, Error, RemoteTransport, Result,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::AsyncRead;

#[derive(Debug, Clone)]
struct RemoteFile {
    content: Vec<u8>,
    modified: i64,
}

#[derive(Debug, Default)]
struct RemoteState {
    files: BTreeMap<String, RemoteFile>,
    dirs: BTreeSet<String>,
    cwd: Vec<String>,
    log: Vec<String>,
    failures: Vec<(String, u16)>,
    late_failures: Vec<(String, u16)>,
    clock_skew: i64,
    mlst: bool,
    dot_entries: bool,
    prefixed_listing: bool,
}

impl RemoteState {
    fn resolve(&self, name: &str) -> String {
        let mut segments = self.cwd.clone();
        segments.extend(
            name.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        segments.join("/")
    }

    fn cwd_path(&self) -> String {
        self.cwd.join("/")
    }

    fn add_dir_with_parents(&mut self, path: &str) {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.dirs.insert(current.clone());
        }
    }

    fn now(&self) -> i64 {
        Utc::now().timestamp() + self.clock_skew
    }

    /// Log `command` and return the injected failure for it, if any
    fn receive(&mut self, command: String) -> Result<()> {
        let failure = self
            .failures
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, code)| *code);
        self.log.push(command);
        match failure {
            Some(code) => Err(Error::reply(code, "injected failure")),
            None => Ok(()),
        }
    }

    fn children(&self) -> Vec<String> {
        let base = self.cwd_path();
        let is_child = |path: &str| -> Option<String> {
            let rest = if base.is_empty() {
                path
            } else {
                path.strip_prefix(base.as_str())?.strip_prefix('/')?
            };
            (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
        };

        let mut names: Vec<String> = self
            .dirs
            .iter()
            .filter_map(|d| is_child(d.as_str()))
            .chain(self.files.keys().filter_map(|f| is_child(f.as_str())))
            .collect();
        names.sort();
        names
    }
}

/// Format epoch seconds as an FTP `time-val`
fn time_val(seconds: i64) -> String {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|t| t.format("%Y%m%d%H%M%S").to_string())
        .unwrap_or_default()
}

/// Shared in-memory remote file tree
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    /// Empty remote
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().expect("remote state poisoned")
    }

    /// Advertise and honor `MLST` with the `modify` and `size` facts
    pub fn with_mlst(self) -> Self {
        self.state().mlst = true;
        self
    }

    /// Make the remote clock run `seconds` ahead of (or, if negative, behind) the local one
    pub fn with_clock_skew(self, seconds: i64) -> Self {
        self.state().clock_skew = seconds;
        self
    }

    /// Include `.` and `..` in name listings
    pub fn with_dot_entries(self) -> Self {
        self.state().dot_entries = true;
        self
    }

    /// Return listed names prefixed with the listed directory's path
    pub fn with_prefixed_listing(self) -> Self {
        self.state().prefixed_listing = true;
        self
    }

    /// Add a file (and its parent directories) with a raw remote modification time
    pub fn add_file(&self, path: &str, content: &[u8], modified: i64) {
        let mut state = self.state();
        if let Some((parent, _)) = path.rsplit_once('/') {
            state.add_dir_with_parents(parent);
        }
        state.files.insert(
            path.to_string(),
            RemoteFile {
                content: content.to_vec(),
                modified,
            },
        );
    }

    /// Add a directory and its parents
    pub fn add_dir(&self, path: &str) {
        self.state().add_dir_with_parents(path);
    }

    /// Whether a file exists at `path`
    pub fn has_file(&self, path: &str) -> bool {
        self.state().files.contains_key(path)
    }

    /// Whether a directory exists at `path`
    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }

    /// Content of the file at `path`
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).map(|f| f.content.clone())
    }

    /// Raw remote modification time of the file at `path`
    pub fn file_modified(&self, path: &str) -> Option<i64> {
        self.state().files.get(path).map(|f| f.modified)
    }

    /// All file paths, sorted
    pub fn file_paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    /// Every command received so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.state().log.clone()
    }

    /// Received commands starting with `verb`
    pub fn commands_with(&self, verb: &str) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter(|c| c.starts_with(verb))
            .cloned()
            .collect()
    }

    /// Forget the command log
    pub fn clear_commands(&self) {
        self.state().log.clear();
    }

    /// Answer every command starting with `prefix` with the negative reply `code`
    pub fn fail_command(&self, prefix: &str, code: u16) {
        self.state().failures.push((prefix.to_string(), code));
    }

    /// Accept uploads starting with `prefix` and store the data, then answer `code`.
    ///
    /// Models a server that writes the file but fails the final reply of the transfer.
    pub fn fail_after_transfer(&self, prefix: &str, code: u16) {
        self.state().late_failures.push((prefix.to_string(), code));
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.late_failures.clear();
    }

    /// Current working directory of the most recent session
    pub fn cwd(&self) -> String {
        self.state().cwd_path()
    }

    /// Open a session at the top of the tree
    pub fn connect(&self) -> MemoryTransport {
        self.state().cwd.clear();
        MemoryTransport {
            remote: self.clone(),
        }
    }
}

/// A session on a [`MemoryRemote`]
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    remote: MemoryRemote,
}

impl MemoryTransport {
    fn reply_to(&self, command: &str) -> Result<String> {
        let mut state = self.remote.state();
        state.receive(command.to_string())?;

        let (verb, argument) = command.split_once(' ').unwrap_or((command, ""));
        let verb = verb.to_ascii_uppercase();
        match verb.as_str() {
            "FEAT" => Ok(if state.mlst {
                "211-Features:\r\n MDTM\r\n SIZE\r\n MLST type*;size*;modify*;\r\n211 End".to_string()
            } else {
                "211-Features:\r\n MDTM\r\n SIZE\r\n211 End".to_string()
            }),
            "OPTS" if state.mlst && argument.to_ascii_uppercase().starts_with("MLST") => {
                Ok("200 MLST OPTS modify;size;".to_string())
            }
            "MDTM" | "SIZE" | "MLST" => {
                if verb == "MLST" && !state.mlst {
                    return Err(Error::reply(500, "MLST not understood"));
                }
                let path = state.resolve(argument);
                let file = state
                    .files
                    .get(&path)
                    .ok_or_else(|| Error::reply(550, format!("{}: No such file", argument)))?;
                Ok(match verb.as_str() {
                    "MDTM" => format!("213 {}", time_val(file.modified)),
                    "SIZE" => format!("213 {}", file.content.len()),
                    _ => format!(
                        "250-Listing {}\r\n modify={};size={}; {}\r\n250 End",
                        argument,
                        time_val(file.modified),
                        file.content.len(),
                        argument
                    ),
                })
            }
            _ => Err(Error::reply(502, format!("{} not implemented", verb))),
        }
    }
}

#[async_trait]
impl RemoteTransport for MemoryTransport {
    async fn change_directory(&mut self, name: &str) -> Result<DirectoryChange> {
        let mut state = self.remote.state();
        state.receive(format!("CWD {}", name))?;
        let path = state.resolve(name);
        if state.dirs.contains(&path) {
            state.cwd.push(name.to_string());
            Ok(DirectoryChange::Entered)
        } else {
            Ok(DirectoryChange::NotFound)
        }
    }

    async fn parent_directory(&mut self) -> Result<()> {
        let mut state = self.remote.state();
        state.receive("CDUP".to_string())?;
        state.cwd.pop();
        Ok(())
    }

    async fn make_directory(&mut self, name: &str) -> Result<()> {
        let mut state = self.remote.state();
        state.receive(format!("MKD {}", name))?;
        let path = state.resolve(name);
        if state.dirs.contains(&path) || state.files.contains_key(&path) {
            return Err(Error::reply(550, format!("{}: File exists", name)));
        }
        state.add_dir_with_parents(&path);
        Ok(())
    }

    async fn list_names(&mut self) -> Result<Vec<String>> {
        let mut state = self.remote.state();
        state.receive("NLST".to_string())?;

        let base = state.cwd_path();
        let mut names: Vec<String> = state
            .children()
            .into_iter()
            .map(|name| {
                if state.prefixed_listing && !base.is_empty() {
                    format!("{}/{}", base, name)
                } else {
                    name
                }
            })
            .collect();
        if state.dot_entries {
            names.splice(0..0, [".".to_string(), "..".to_string()]);
        }
        Ok(names)
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        self.reply_to(command)
    }

    async fn store_file(
        &mut self,
        remote_name: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        block_size: usize,
        on_block: &mut BlockCallback<'_>,
    ) -> Result<u64> {
        let path = {
            let mut state = self.remote.state();
            state.receive(format!("STOR {}", remote_name))?;
            state.resolve(remote_name)
        };

        let mut content = Vec::new();
        let mut block = vec![0u8; block_size];
        loop {
            let n = fill_block(source, &mut block).await?;
            if n == 0 {
                break;
            }
            content.extend_from_slice(&block[..n]);
            on_block(n);
        }

        let mut state = self.remote.state();
        let modified = state.now();
        let size = content.len() as u64;
        state.files.insert(path, RemoteFile { content, modified });

        let command = format!("STOR {}", remote_name);
        if let Some((_, code)) = state
            .late_failures
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
        {
            return Err(Error::reply(*code, "transfer aborted"));
        }
        Ok(size)
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        let mut state = self.remote.state();
        state.receive(format!("DELE {}", path))?;
        let full = state.resolve(path);
        if state.files.remove(&full).is_none() {
            return Err(Error::reply(550, format!("{}: No such file", path)));
        }
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.remote.state().receive("QUIT".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_round_trip() {
        let remote = MemoryRemote::new();
        remote.add_file("a/b.txt", b"hello", 100);
        let mut transport = remote.connect();

        assert_eq!(
            transport.change_directory("missing").await.unwrap(),
            DirectoryChange::NotFound
        );
        assert_eq!(
            transport.change_directory("a").await.unwrap(),
            DirectoryChange::Entered
        );
        assert_eq!(transport.list_names().await.unwrap(), vec!["b.txt"]);
        assert_eq!(
            transport.send_command("SIZE b.txt").await.unwrap(),
            "213 5"
        );
        transport.parent_directory().await.unwrap();
        assert_eq!(remote.cwd(), "");
    }

    #[tokio::test]
    async fn test_store_and_delete() {
        let remote = MemoryRemote::new().with_clock_skew(30);
        let mut transport = remote.connect();
        let mut source: &[u8] = b"payload";
        let mut blocks = Vec::new();

        let stored = transport
            .store_file("p.txt", &mut source, 3, &mut |n: usize| blocks.push(n))
            .await
            .unwrap();

        assert_eq!(stored, 7);
        assert_eq!(blocks, vec![3, 3, 1]);
        assert_eq!(remote.file_content("p.txt").unwrap(), b"payload");
        let skewed = remote.file_modified("p.txt").unwrap() - Utc::now().timestamp();
        assert!((29..=30).contains(&skewed));

        transport.delete_file("p.txt").await.unwrap();
        assert!(!remote.has_file("p.txt"));
        assert!(transport.delete_file("p.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_is_logged() {
        let remote = MemoryRemote::new();
        remote.fail_command("FEAT", 502);
        let mut transport = remote.connect();

        let err = transport.send_command("FEAT").await.unwrap_err();
        assert_eq!(err.reply_code(), Some(502));
        assert_eq!(remote.commands(), vec!["FEAT"]);
    }
}
