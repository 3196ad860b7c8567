//! Passive-mode data connections

use crate::connection::connect_with_timeout;
use crate::protocol::Reply;
use ftpmirror_types::{fill_block, BlockCallback, Error, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Extract the port advertised in a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
///
/// The advertised host is ignored: the data connection goes to the control connection's
/// peer, which keeps working behind NAT.
pub fn parse_pasv_port(reply: &Reply) -> Result<u16> {
    let text = reply.message();
    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| Error::protocol(format!("malformed PASV reply '{}'", reply)))?;
    let numbers: Vec<u16> = text[start..]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .take(6)
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::protocol(format!("malformed PASV reply '{}'", reply)))?;

    match numbers.as_slice() {
        [_, _, _, _, high, low] if *high < 256 && *low < 256 => Ok(high * 256 + low),
        _ => Err(Error::protocol(format!("malformed PASV reply '{}'", reply))),
    }
}

/// An open data connection
#[derive(Debug)]
pub struct DataConnection {
    stream: TcpStream,
}

impl DataConnection {
    /// Connect to `port` on the control connection's peer
    pub async fn open(host: IpAddr, port: u16, timeout: Duration) -> Result<Self> {
        let addr = SocketAddr::new(host, port);
        debug!("Opening data connection to {}", addr);
        let stream = connect_with_timeout(&addr.to_string(), timeout).await?;
        Ok(Self { stream })
    }

    /// Stream `source` in blocks of `block_size`, calling `on_block` for each one.
    ///
    /// Returns the number of bytes sent. The connection is closed afterwards, which tells the
    /// server the upload is complete.
    pub async fn send_blocks(
        mut self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        block_size: usize,
        on_block: &mut BlockCallback<'_>,
    ) -> Result<u64> {
        let mut block = vec![0u8; block_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = fill_block(source, &mut block).await?;
            if n == 0 {
                break;
            }
            self.stream
                .write_all(&block[..n])
                .await
                .map_err(|e| Error::network(format!("data connection write failed: {}", e)))?;
            total += n as u64;
            on_block(n);
        }
        self.stream
            .shutdown()
            .await
            .map_err(|e| Error::network(format!("cannot close data connection: {}", e)))?;
        Ok(total)
    }

    /// Read the whole transfer as lines of text
    pub async fn read_lines(mut self) -> Result<Vec<String>> {
        let mut data = Vec::new();
        self.stream
            .read_to_end(&mut data)
            .await
            .map_err(|e| Error::network(format!("data connection read failed: {}", e)))?;
        Ok(split_listing(&data))
    }
}

/// Split a name listing into lines.
///
/// Names that are not valid UTF-8 cannot be sent back to the server unchanged, so they are
/// skipped with a warning instead of being rewritten.
pub fn split_listing(data: &[u8]) -> Vec<String> {
    data.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .filter_map(|line| match std::str::from_utf8(line) {
            Ok(name) => Some(name.to_string()),
            Err(_) => {
                warn!(
                    "Skipping listing entry that is not valid UTF-8: {}",
                    String::from_utf8_lossy(line)
                );
                None
            }
        })
        .collect()
}
