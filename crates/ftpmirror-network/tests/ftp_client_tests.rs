//! FTP client tests against a scripted in-process server

use ftpmirror_network::{ClientConfig, FtpClient};
use ftpmirror_types::{DirectoryChange, RemoteTransport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct ServerState {
    commands: Vec<String>,
    files: HashMap<String, Vec<u8>>,
}

/// Serve one control connection with a minimal FTP dialect
async fn serve(stream: TcpStream, state: Arc<Mutex<ServerState>>) {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut data_listener: Option<TcpListener> = None;

    writer.write_all(b"220-Welcome\r\n220 Ready\r\n").await.unwrap();

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await.unwrap() == 0 {
            return;
        }
        let command = line.trim_end().to_string();
        state.lock().unwrap().commands.push(command.clone());
        let (verb, argument) = command.split_once(' ').unwrap_or((command.as_str(), ""));

        let reply: String = match verb {
            "USER" => "331 Password required\r\n".into(),
            "PASS" if argument == "secret" => "230 Logged in\r\n".into(),
            "PASS" => "530 Login incorrect\r\n".into(),
            "TYPE" => "200 Type set to I\r\n".into(),
            "CWD" if argument == "docs" => "250 OK\r\n".into(),
            "CWD" => "550 No such directory\r\n".into(),
            "CDUP" => "250 OK\r\n".into(),
            "MKD" => format!("257 \"{}\" created\r\n", argument),
            "FEAT" => "211-Features:\r\n MDTM\r\n MLST size*;modify*;\r\n211 End\r\n".into(),
            "MDTM" => "213 20240101120000\r\n".into(),
            "DELE" => "550 Permission denied\r\n".into(),
            "SITE" => "150 Working\r\n200 Done\r\n".into(),
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                data_listener = Some(listener);
                format!(
                    "227 Entering Passive Mode (10,9,8,7,{},{})\r\n",
                    port / 256,
                    port % 256
                )
            }
            "NLST" => {
                let listener = data_listener.take().unwrap();
                writer.write_all(b"150 Here comes the listing\r\n").await.unwrap();
                let (mut data, _) = listener.accept().await.unwrap();
                data.write_all(b"index.html\r\ndocs\r\n").await.unwrap();
                drop(data);
                "226 Transfer complete\r\n".into()
            }
            "STOR" => {
                let listener = data_listener.take().unwrap();
                writer.write_all(b"150 Ok to send data\r\n").await.unwrap();
                let (mut data, _) = listener.accept().await.unwrap();
                let mut content = Vec::new();
                data.read_to_end(&mut content).await.unwrap();
                state
                    .lock()
                    .unwrap()
                    .files
                    .insert(argument.to_string(), content);
                "226 Transfer complete\r\n".into()
            }
            "QUIT" => {
                writer.write_all(b"221 Goodbye\r\n").await.unwrap();
                return;
            }
            _ => "502 Command not implemented\r\n".into(),
        };
        writer.write_all(reply.as_bytes()).await.unwrap();
    }
}

async fn start_server() -> (u16, Arc<Mutex<ServerState>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(ServerState::default()));
    let server_state = state.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, server_state).await;
    });
    (port, state)
}

fn config(port: u16, password: &str) -> ClientConfig {
    let mut config = ClientConfig::new("127.0.0.1", "alice", password);
    config.port = port;
    config
}

#[tokio::test]
async fn test_login_and_directory_commands() {
    let (port, state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();

    assert_eq!(
        client.change_directory("docs").await.unwrap(),
        DirectoryChange::Entered
    );
    assert_eq!(
        client.change_directory("missing").await.unwrap(),
        DirectoryChange::NotFound
    );
    client.parent_directory().await.unwrap();
    client.make_directory("new").await.unwrap();
    client.quit().await.unwrap();

    let commands = state.lock().unwrap().commands.clone();
    assert_eq!(
        commands,
        vec![
            "USER alice",
            "PASS secret",
            "TYPE I",
            "CWD docs",
            "CWD missing",
            "CDUP",
            "MKD new",
            "QUIT"
        ]
    );
}

#[tokio::test]
async fn test_bad_password_is_rejected() {
    let (port, _state) = start_server().await;

    let err = FtpClient::connect(&config(port, "wrong")).await.unwrap_err();

    assert_eq!(err.reply_code(), Some(530));
}

#[tokio::test]
async fn test_multi_line_reply_is_returned_whole() {
    let (port, _state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();

    let feat = client.send_command("FEAT").await.unwrap();

    assert!(feat.starts_with("211-Features:"));
    assert!(feat.contains(" MLST size*;modify*;"));
    assert!(feat.ends_with("211 End"));
}

#[tokio::test]
async fn test_negative_replies_become_errors() {
    let (port, _state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();

    let err = client.send_command("SIZE x").await.unwrap_err();
    assert_eq!(err.reply_code(), Some(502));
    assert!(err.is_permanent_reply());

    let err = client.delete_file("x").await.unwrap_err();
    assert_eq!(err.reply_code(), Some(550));
}

#[tokio::test]
async fn test_preliminary_reply_is_drained() {
    let (port, _state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();

    let site = client.send_command("SITE CHMOD 644 x").await.unwrap();
    assert_eq!(site, "200 Done");

    // The next command must read its own reply, not the leftover one
    let mdtm = client.send_command("MDTM x").await.unwrap();
    assert_eq!(mdtm, "213 20240101120000");
}

#[tokio::test]
async fn test_listing_uses_control_peer_for_data() {
    let (port, _state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();

    // The server advertises 10.9.8.7; only the port is used
    let names = client.list_names().await.unwrap();

    assert_eq!(names, vec!["index.html", "docs"]);
}

#[tokio::test]
async fn test_store_streams_blocks() {
    let (port, state) = start_server().await;
    let mut client = FtpClient::connect(&config(port, "secret")).await.unwrap();
    let payload = vec![7u8; 100];
    let mut source: &[u8] = &payload;
    let mut blocks = Vec::new();

    let sent = client
        .store_file("blob.bin", &mut source, 40, &mut |n: usize| blocks.push(n))
        .await
        .unwrap();

    assert_eq!(sent, 100);
    assert_eq!(blocks, vec![40, 40, 20]);
    assert_eq!(state.lock().unwrap().files["blob.bin"], payload);
}
