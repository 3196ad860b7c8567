//! Remote file metadata queries and reply parsing

use crate::features::RemoteCapabilities;
use chrono::NaiveDateTime;
use ftpmirror_types::{Error, RemoteFileMetadata, RemoteTransport, Result, TimeOffset};
use tracing::debug;

/// Parse an FTP `time-val` (`YYYYMMDDHHMMSS[.sss]`, UTC) into epoch seconds
pub fn parse_time_val(value: &str) -> Result<i64> {
    let digits = value.trim();
    let whole = digits.split('.').next().unwrap_or(digits);
    if whole.len() != 14 {
        return Err(Error::protocol(format!("malformed timestamp '{}'", value)));
    }
    NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S")
        .map(|time| time.and_utc().timestamp())
        .map_err(|e| Error::protocol(format!("malformed timestamp '{}': {}", value, e)))
}

/// Second word of a single line reply such as `213 20240101120000`
fn reply_argument(reply: &str) -> Result<&str> {
    reply
        .lines()
        .last()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| Error::protocol(format!("unexpected reply '{}'", reply.trim())))
}

/// Parse an `MDTM` reply into epoch seconds
pub fn parse_mdtm_reply(reply: &str) -> Result<i64> {
    parse_time_val(reply_argument(reply)?)
}

/// Parse a `SIZE` reply into bytes
pub fn parse_size_reply(reply: &str) -> Result<u64> {
    let value = reply_argument(reply)?;
    value
        .parse()
        .map_err(|_| Error::protocol(format!("malformed size '{}'", value)))
}

/// Parse the `modify` and `size` facts out of an `MLST` reply
pub fn parse_mlst_reply(reply: &str) -> Result<(i64, u64)> {
    // The entry line is the one indented by a single space: " fact=value;fact=value; name"
    let entry = reply
        .lines()
        .find(|line| line.starts_with(' '))
        .ok_or_else(|| Error::protocol(format!("no entry in MLST reply '{}'", reply.trim())))?;
    let facts = entry.trim_start().split(' ').next().unwrap_or_default();

    let mut modified = None;
    let mut size = None;
    for fact in facts.split(';') {
        let Some((name, value)) = fact.split_once('=') else {
            continue;
        };
        match name.to_ascii_lowercase().as_str() {
            "modify" => modified = Some(parse_time_val(value)?),
            "size" => {
                size = Some(
                    value
                        .parse()
                        .map_err(|_| Error::protocol(format!("malformed size '{}'", value)))?,
                );
            }
            _ => {}
        }
    }

    match (modified, size) {
        (Some(modified), Some(size)) => Ok((modified, size)),
        _ => Err(Error::protocol(format!(
            "MLST reply lacks modify or size facts: '{}'",
            entry.trim()
        ))),
    }
}

/// Fetch metadata for `name` in the current remote directory.
///
/// Returns `None` when the server answers with a permanent negative reply, which is how a
/// missing (or unreadable) file presents itself. Any other failure is returned as an error.
pub async fn fetch_remote_metadata<T>(
    transport: &mut T,
    name: &str,
    capabilities: RemoteCapabilities,
    offset: TimeOffset,
) -> Result<Option<RemoteFileMetadata>>
where
    T: RemoteTransport + ?Sized,
{
    let raw = if capabilities.mlst_modify_size {
        query_mlst(transport, name).await
    } else {
        query_mdtm_size(transport, name).await
    };

    match raw {
        Ok((modified, size)) => Ok(Some(RemoteFileMetadata::from_raw(modified, size, offset))),
        Err(e) if e.is_permanent_reply() => {
            debug!("No remote metadata for {}: {}", name, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn query_mlst<T>(transport: &mut T, name: &str) -> Result<(i64, u64)>
where
    T: RemoteTransport + ?Sized,
{
    let reply = transport.send_command(&format!("MLST {}", name)).await?;
    parse_mlst_reply(&reply)
}

async fn query_mdtm_size<T>(transport: &mut T, name: &str) -> Result<(i64, u64)>
where
    T: RemoteTransport + ?Sized,
{
    let modified = parse_mdtm_reply(&transport.send_command(&format!("MDTM {}", name)).await?)?;
    let size = parse_size_reply(&transport.send_command(&format!("SIZE {}", name)).await?)?;
    Ok((modified, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpmirror_tests::MemoryRemote;
    use rstest::rstest;

    #[rstest]
    #[case("19700101000000", 0)]
    #[case("20240101120000", 1_704_110_400)]
    #[case("20240101120000.123", 1_704_110_400)]
    fn test_parse_time_val(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_time_val(input).unwrap(), expected);
    }

    #[rstest]
    #[case("2024")]
    #[case("2024010112000x")]
    #[case("20241301120000")]
    fn test_parse_time_val_rejects_garbage(#[case] input: &str) {
        assert!(parse_time_val(input).is_err());
    }

    #[test]
    fn test_parse_simple_replies() {
        assert_eq!(parse_mdtm_reply("213 20240101120000").unwrap(), 1_704_110_400);
        assert_eq!(parse_size_reply("213 4096").unwrap(), 4096);
        assert!(parse_size_reply("213").is_err());
        assert!(parse_size_reply("213 lots").is_err());
    }

    #[test]
    fn test_parse_mlst_reply() {
        let reply = "250-Listing index.html\r\n Type=file;Size=1830;Modify=20240101120000; index.html\r\n250 End";
        assert_eq!(parse_mlst_reply(reply).unwrap(), (1_704_110_400, 1830));
    }

    #[test]
    fn test_parse_mlst_reply_requires_both_facts() {
        let reply = "250-Listing a\n type=file;size=3; a\n250 End";
        assert!(parse_mlst_reply(reply).is_err());
        assert!(parse_mlst_reply("250 End").is_err());
    }

    #[tokio::test]
    async fn test_fetch_applies_offset() {
        let remote = MemoryRemote::new();
        remote.add_file("a.txt", b"hello", 1_000);
        let mut transport = remote.connect();

        let meta = fetch_remote_metadata(
            &mut transport,
            "a.txt",
            RemoteCapabilities::default(),
            TimeOffset::from_secs(25),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(meta.modified, 1_025);
        assert_eq!(meta.size, 5);
        assert_eq!(remote.commands(), vec!["MDTM a.txt", "SIZE a.txt"]);
    }

    #[tokio::test]
    async fn test_fetch_uses_single_mlst_query_when_enabled() {
        let remote = MemoryRemote::new().with_mlst();
        remote.add_file("a.txt", b"hello", 1_000);
        let mut transport = remote.connect();
        let capabilities = RemoteCapabilities {
            mlst_modify_size: true,
        };

        let meta = fetch_remote_metadata(&mut transport, "a.txt", capabilities, TimeOffset::ZERO)
            .await
            .unwrap()
            .unwrap();

        assert_eq!((meta.modified, meta.size), (1_000, 5));
        assert_eq!(remote.commands(), vec!["MLST a.txt"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_absent_not_fatal() {
        let remote = MemoryRemote::new();
        let mut transport = remote.connect();

        let meta = fetch_remote_metadata(
            &mut transport,
            "missing.txt",
            RemoteCapabilities::default(),
            TimeOffset::ZERO,
        )
        .await
        .unwrap();

        assert!(meta.is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_is_fatal() {
        let remote = MemoryRemote::new();
        remote.add_file("a.txt", b"x", 10);
        remote.fail_command("MDTM a.txt", 421);
        let mut transport = remote.connect();

        let err = fetch_remote_metadata(
            &mut transport,
            "a.txt",
            RemoteCapabilities::default(),
            TimeOffset::ZERO,
        )
        .await
        .unwrap_err();

        assert_eq!(err.reply_code(), Some(421));
    }
}
