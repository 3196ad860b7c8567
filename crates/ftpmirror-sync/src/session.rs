//! Per-run remote session state

use crate::features::RemoteCapabilities;
use crate::metadata::fetch_remote_metadata;
use crate::navigator::RemoteNavigator;
use ftpmirror_types::{RemoteFileMetadata, RemoteTransport, Result, TimeOffset};

/// A connected transport together with everything learned about the server during a run
#[derive(Debug)]
pub struct MirrorSession<T> {
    transport: T,
    offset: TimeOffset,
    capabilities: RemoteCapabilities,
    navigator: RemoteNavigator,
}

impl<T: RemoteTransport> MirrorSession<T> {
    /// Wrap a freshly connected transport; the working directory is taken as the origin
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            offset: TimeOffset::ZERO,
            capabilities: RemoteCapabilities::default(),
            navigator: RemoteNavigator::new(),
        }
    }

    /// Clock offset in effect
    pub fn offset(&self) -> TimeOffset {
        self.offset
    }

    /// Record the calibrated clock offset
    pub fn set_offset(&mut self, offset: TimeOffset) {
        self.offset = offset;
    }

    /// Negotiated capabilities
    pub fn capabilities(&self) -> RemoteCapabilities {
        self.capabilities
    }

    /// Record the negotiated capabilities
    pub fn set_capabilities(&mut self, capabilities: RemoteCapabilities) {
        self.capabilities = capabilities;
    }

    /// Directory navigation state
    pub fn navigator(&self) -> &RemoteNavigator {
        &self.navigator
    }

    /// Direct access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Make the current remote directory the document root
    pub fn mark_root(&mut self) {
        self.navigator.mark_root();
    }

    /// Move to `segments` below the document root, creating directories as needed
    pub async fn goto_path(&mut self, segments: &[String]) -> Result<()> {
        self.navigator.goto_path(&mut self.transport, segments).await
    }

    /// Metadata of `name` in the current directory, corrected by the clock offset
    pub async fn remote_metadata(&mut self, name: &str) -> Result<Option<RemoteFileMetadata>> {
        fetch_remote_metadata(&mut self.transport, name, self.capabilities, self.offset).await
    }

    /// End the session, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}
