//! Clock offset calibration
//!
//! The remote server's clock is measured once per run by storing a small marker file in the
//! document root and reading back its modification time.

use crate::metadata::parse_mdtm_reply;
use ftpmirror_types::{DirectoryChange, Error, RemoteTransport, Result, TimeOffset};
use tracing::{debug, info, warn};

/// Default name of the marker file
pub const MARKER_NAME: &str = ".timestamp";

/// Measure the offset between the local and remote clocks.
///
/// Must be called with the working directory at the document root. The marker is removed
/// again afterwards; failing to remove it only produces a warning.
pub async fn calibrate_time_offset<T>(transport: &mut T, marker_name: &str) -> Result<TimeOffset>
where
    T: RemoteTransport + ?Sized,
{
    let stamp = chrono::Utc::now().timestamp().to_string();
    let mut content = stamp.as_bytes();
    let block_size = content.len().max(1);

    let stored = transport
        .store_file(marker_name, &mut content, block_size, &mut |_: usize| {})
        .await;
    if let Err(e) = stored {
        // The server may have written the file before failing the transfer
        remove_marker(transport, marker_name).await;
        return Err(Error::calibration(format!(
            "cannot store {}: {}",
            marker_name, e
        )));
    }
    let local_time = chrono::Utc::now().timestamp();

    let remote_time = match transport.send_command(&format!("MDTM {}", marker_name)).await {
        Ok(reply) => parse_mdtm_reply(&reply)
            .map_err(|e| Error::calibration(format!("cannot read time of {}: {}", marker_name, e))),
        Err(e) => Err(Error::calibration(format!(
            "cannot read time of {}: {}",
            marker_name, e
        ))),
    };

    remove_marker(transport, marker_name).await;

    let offset = TimeOffset::between(local_time, remote_time?);
    info!("Remote clock offset is {}", offset);
    Ok(offset)
}

async fn remove_marker<T>(transport: &mut T, marker_name: &str)
where
    T: RemoteTransport + ?Sized,
{
    if let Err(e) = transport.delete_file(marker_name).await {
        warn!("Could not remove {}: {}", marker_name, e);
    }
}

/// Walk into (creating as needed) each segment of the document root
pub async fn enter_document_root<T>(transport: &mut T, segments: &[String]) -> Result<u64>
where
    T: RemoteTransport + ?Sized,
{
    let mut created = 0;
    for segment in segments {
        if transport.change_directory(segment).await? == DirectoryChange::NotFound {
            debug!("Creating document root directory {}", segment);
            transport.make_directory(segment).await?;
            created += 1;
            if transport.change_directory(segment).await? == DirectoryChange::NotFound {
                return Err(Error::protocol(format!(
                    "directory {} still missing after creation",
                    segment
                )));
            }
        }
    }
    Ok(created)
}
