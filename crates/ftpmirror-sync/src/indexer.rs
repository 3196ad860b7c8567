//! Recursive remote listing for orphan detection

use crate::filter::PathFilter;
use crate::progress::ProgressObserver;
use ftpmirror_types::{DirectoryChange, RemoteTransport, Result};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

/// Enumerates every file below the document root that is not protected by a keep rule
pub struct RemoteIndexer<'a> {
    filter: &'a PathFilter,
    progress: &'a dyn ProgressObserver,
}

impl<'a> RemoteIndexer<'a> {
    /// Create an indexer using the keep rules of `filter`
    pub fn new(filter: &'a PathFilter, progress: &'a dyn ProgressObserver) -> Self {
        Self { filter, progress }
    }

    /// List all orphan candidates, starting from the current remote directory.
    ///
    /// The remote working directory is the same on return as on entry.
    pub async fn index<T>(&self, transport: &mut T) -> Result<BTreeSet<String>>
    where
        T: RemoteTransport + ?Sized,
    {
        let mut candidates = BTreeSet::new();
        self.index_recursive(transport, String::new(), &mut candidates)
            .await?;
        info!("Indexed {} remote files", candidates.len());
        Ok(candidates)
    }

    fn index_recursive<'b, T>(
        &'b self,
        transport: &'b mut T,
        prefix: String,
        candidates: &'b mut BTreeSet<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'b>>
    where
        T: RemoteTransport + ?Sized,
        'a: 'b,
    {
        Box::pin(async move {
            let names = transport.list_names().await?;
            self.progress.directory_indexed(&prefix, names.len());

            for listed in names {
                let name = last_segment(&listed);
                if name.is_empty() || name == "." || name == ".." {
                    continue;
                }

                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", prefix, name)
                };

                if self.filter.is_kept(&path) {
                    info!("keeping {}", path);
                    continue;
                }

                match transport.change_directory(name).await? {
                    DirectoryChange::Entered => {
                        self.index_recursive(&mut *transport, path, &mut *candidates)
                            .await?;
                        transport.parent_directory().await?;
                    }
                    DirectoryChange::NotFound => {
                        debug!("Remote file {}", path);
                        candidates.insert(path);
                    }
                }
            }

            Ok(())
        })
    }
}

impl std::fmt::Debug for RemoteIndexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteIndexer")
            .field("keep_rules", &self.filter.keep_count())
            .finish()
    }
}

/// Some servers answer NLST with paths; keep only the entry name
fn last_segment(listed: &str) -> &str {
    listed.trim_end_matches('/').rsplit('/').next().unwrap_or(listed)
}
