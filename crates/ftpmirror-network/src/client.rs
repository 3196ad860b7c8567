//! FTP client implementing the mirror transport

use crate::{
    connection::ControlConnection,
    protocol::Reply,
    transfer::{parse_pasv_port, DataConnection},
};
use async_trait::async_trait;
use ftpmirror_config::ConnectionConfig;
use ftpmirror_types::{BlockCallback, DirectoryChange, RemoteTransport, Result};
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{debug, info};

/// Default FTP control port
pub const DEFAULT_PORT: u16 = 21;

/// FTP client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,
    /// Control port
    pub port: u16,
    /// Login name
    pub user: String,
    /// Password
    pub password: String,
    /// Timeout for establishing control and data connections
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default port and timeout
    pub fn new<H, U, P>(host: H, user: U, password: P) -> Self
    where
        H: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Apply port and timeout settings
    pub fn with_connection(mut self, connection: &ConnectionConfig) -> Self {
        self.port = connection.port;
        self.connect_timeout = Duration::from_secs(connection.connect_timeout_secs);
        self
    }

    /// `host:port` of the control connection
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// A logged-in FTP session in binary mode
#[derive(Debug)]
pub struct FtpClient {
    control: ControlConnection,
    connect_timeout: Duration,
}

impl FtpClient {
    /// Connect, log in and switch to binary transfers
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let address = config.address();
        info!("Connecting to {}", address);
        let control = ControlConnection::connect(&address, config.connect_timeout).await?;
        let mut client = Self {
            control,
            connect_timeout: config.connect_timeout,
        };

        client.read_final_reply().await?.expect(&[220])?;
        client.login(&config.user, &config.password).await?;
        client.control.command("TYPE I").await?.expect_completion()?;

        info!("Logged in to {} as {}", address, config.user);
        Ok(client)
    }

    /// Skip 1xx "please wait" replies
    async fn read_final_reply(&mut self) -> Result<Reply> {
        loop {
            let reply = self.control.read_reply().await?;
            if !reply.is_preliminary() {
                return Ok(reply);
            }
        }
    }

    async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let reply = self.control.command(&format!("USER {}", user)).await?;
        match reply.code {
            230 => Ok(()),
            331 | 332 => {
                self.control
                    .command(&format!("PASS {}", password))
                    .await?
                    .expect(&[202, 230])?;
                Ok(())
            }
            _ => Err(reply.into_error()),
        }
    }

    /// Send `command` and require a positive completion
    async fn simple_command(&mut self, command: &str) -> Result<Reply> {
        self.control.command(command).await?.expect_completion()
    }

    /// Enter passive mode and connect the data channel
    async fn open_data_connection(&mut self) -> Result<DataConnection> {
        let reply = self.control.command("PASV").await?.expect(&[227])?;
        let port = parse_pasv_port(&reply)?;
        DataConnection::open(self.control.peer().ip(), port, self.connect_timeout).await
    }
}

#[async_trait]
impl RemoteTransport for FtpClient {
    async fn change_directory(&mut self, name: &str) -> Result<DirectoryChange> {
        let reply = self.control.command(&format!("CWD {}", name)).await?;
        if reply.is_permanent_negative() {
            debug!("No directory {}: {}", name, reply.message());
            return Ok(DirectoryChange::NotFound);
        }
        reply.expect_completion()?;
        Ok(DirectoryChange::Entered)
    }

    async fn parent_directory(&mut self) -> Result<()> {
        self.simple_command("CDUP").await.map(|_| ())
    }

    async fn make_directory(&mut self, name: &str) -> Result<()> {
        self.simple_command(&format!("MKD {}", name)).await.map(|_| ())
    }

    async fn list_names(&mut self) -> Result<Vec<String>> {
        let data = self.open_data_connection().await?;
        let reply = self.control.command("NLST").await?;
        match reply.code {
            // Empty directory on many servers
            450 | 550 => {
                debug!("Empty listing: {}", reply.message());
                return Ok(Vec::new());
            }
            _ if reply.is_preliminary() => {}
            _ => return Err(reply.into_error()),
        }

        let names = data.read_lines().await?;
        self.read_final_reply().await?.expect_completion()?;
        Ok(names)
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        let mut reply = self.control.command(command).await?;
        if reply.is_preliminary() {
            // A 1xx reply announces a final one that must be drained
            reply = self.read_final_reply().await?;
        }
        if reply.is_positive() {
            Ok(reply.text)
        } else {
            Err(reply.into_error())
        }
    }

    async fn store_file(
        &mut self,
        remote_name: &str,
        source: &mut (dyn AsyncRead + Send + Unpin),
        block_size: usize,
        on_block: &mut BlockCallback<'_>,
    ) -> Result<u64> {
        let data = self.open_data_connection().await?;
        let reply = self.control.command(&format!("STOR {}", remote_name)).await?;
        if !reply.is_preliminary() {
            return Err(reply.into_error());
        }

        let sent = data.send_blocks(source, block_size, on_block).await?;
        self.read_final_reply().await?.expect_completion()?;
        debug!("Stored {} ({} bytes)", remote_name, sent);
        Ok(sent)
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        self.simple_command(&format!("DELE {}", path)).await.map(|_| ())
    }

    async fn quit(&mut self) -> Result<()> {
        let reply = self.control.command("QUIT").await?;
        self.control.shutdown().await?;
        if reply.code == 221 {
            Ok(())
        } else {
            Err(reply.into_error())
        }
    }
}
