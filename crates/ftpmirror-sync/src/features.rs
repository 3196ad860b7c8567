//! Optional server capability negotiation

use ftpmirror_types::RemoteTransport;
use tracing::{debug, info};

/// Facts the metadata optimization needs from `MLST`
const REQUIRED_FACTS: [&str; 2] = ["modify", "size"];

/// Optional server features in use for this session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCapabilities {
    /// `MLST` can return modification time and size in a single request
    pub mlst_modify_size: bool,
}

/// Whether a `FEAT` reply advertises `MLST` with both the `modify` and `size` facts.
///
/// Fact names are matched case-insensitively and the `*` marking currently enabled facts is
/// ignored.
pub fn advertises_mlst_facts(feat_reply: &str) -> bool {
    feat_reply
        .lines()
        .filter_map(|line| line.strip_prefix(' '))
        .find_map(|line| {
            let lowered = line.trim_end().to_ascii_lowercase();
            lowered.strip_prefix("mlst ").map(str::to_string)
        })
        .map_or(false, |facts| {
            let facts: Vec<String> = facts
                .split(';')
                .map(|fact| fact.trim().trim_end_matches('*').to_string())
                .collect();
            REQUIRED_FACTS
                .iter()
                .all(|required| facts.iter().any(|fact| fact == required))
        })
}

/// Ask the server which optional features it offers and enable the ones we can use.
///
/// Never fails: any negative or malformed reply leaves the optimization off.
pub async fn negotiate_capabilities<T>(transport: &mut T) -> RemoteCapabilities
where
    T: RemoteTransport + ?Sized,
{
    let feat = match transport.send_command("FEAT").await {
        Ok(reply) => reply,
        Err(e) => {
            debug!("FEAT not available: {}", e);
            return RemoteCapabilities::default();
        }
    };

    if !advertises_mlst_facts(&feat) {
        debug!("Server does not offer MLST modify and size facts");
        return RemoteCapabilities::default();
    }

    match transport.send_command("OPTS MLST modify;size;").await {
        Ok(_) => {
            info!("Using MLST for remote file metadata");
            RemoteCapabilities {
                mlst_modify_size: true,
            }
        }
        Err(e) => {
            debug!("OPTS MLST refused: {}", e);
            RemoteCapabilities::default()
        }
    }
}
