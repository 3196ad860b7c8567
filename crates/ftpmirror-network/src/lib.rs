//! Asynchronous FTP client for ftpmirror
//!
//! A small, sequential FTP client on top of tokio, sufficient for mirroring:
//!
//! - **Control connection**: command/reply framing with multi-line reply support
//! - **Login**: `USER`/`PASS` followed by binary mode (`TYPE I`)
//! - **Passive data connections**: `NLST` listings and block-wise `STOR` uploads
//! - **Transport**: [`FtpClient`] implements [`ftpmirror_types::RemoteTransport`]
//!
//! Commands are logged at `debug` level with passwords masked, replies at `trace` level.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ftpmirror_network::{ClientConfig, FtpClient};
//! use ftpmirror_types::RemoteTransport;
//!
//! # async fn example() -> ftpmirror_types::Result<()> {
//! let config = ClientConfig::new("ftp.example.com", "alice", "secret");
//! let mut client = FtpClient::connect(&config).await?;
//! let names = client.list_names().await?;
//! println!("{} entries", names.len());
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod connection;
pub mod protocol;
pub mod transfer;

pub use client::{ClientConfig, FtpClient, DEFAULT_PORT};
pub use connection::ControlConnection;
pub use protocol::{Reply, ReplyClass};
pub use transfer::DataConnection;
