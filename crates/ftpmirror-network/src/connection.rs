//! FTP control connection

use crate::protocol::{loggable, parse_reply_line, Reply, ReplyLine};
use ftpmirror_types::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Open a TCP connection, failing after `timeout`
pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<TcpStream> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(Error::network(format!("cannot connect to {}: {}", addr, e))),
        Err(_) => Err(Error::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}

/// Line oriented command channel of an FTP session
#[derive(Debug)]
pub struct ControlConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
}

impl ControlConnection {
    /// Connect to `addr`
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let stream = connect_with_timeout(addr, timeout).await?;
        Self::from_stream(stream)
    }

    /// Wrap an established stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map_err(|e| Error::network(format!("no peer address: {}", e)))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer,
        })
    }

    /// Address of the server end
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send one command line
    pub async fn send(&mut self, command: &str) -> Result<()> {
        debug!("> {}", loggable(command));
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .map_err(|e| Error::network(format!("cannot send command: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Error::network(format!("cannot send command: {}", e)))
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| Error::network(format!("cannot read reply: {}", e)))?;
        if read == 0 {
            return Err(Error::network("connection closed by server"));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!("< {}", line);
        Ok(line)
    }

    /// Read one complete reply, following multi-line replies to their last line
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let first = self.read_line().await?;
        match parse_reply_line(&first) {
            ReplyLine::Last(code) => Ok(Reply::new(code, first)),
            ReplyLine::First(code) => {
                let mut lines = vec![first];
                loop {
                    let line = self.read_line().await?;
                    let done = parse_reply_line(&line) == ReplyLine::Last(code);
                    lines.push(line);
                    if done {
                        return Ok(Reply::new(code, lines.join("\n")));
                    }
                }
            }
            ReplyLine::Continuation => Err(Error::protocol(format!(
                "malformed reply line '{}'",
                first
            ))),
        }
    }

    /// Send a command and read its reply
    pub async fn command(&mut self, command: &str) -> Result<Reply> {
        self.send(command).await?;
        self.read_reply().await
    }

    /// Close the write side of the connection
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| Error::network(format!("cannot close connection: {}", e)))
    }
}
