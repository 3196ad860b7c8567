//! ftpmirror - one-way mirroring of a local directory to an FTP server
//!
//! Uploads new and changed files, creates missing directories and, on request, deletes remote
//! files that no longer exist locally.

mod display;
mod json_output;
mod progress;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use ftpmirror_config::{builder::validate, ConfigLoader, MirrorConfig};
use ftpmirror_network::{ClientConfig, FtpClient};
use ftpmirror_sync::{MirrorSession, SyncEngine, SyncOptions, SyncRequest, SyncResult};
use ftpmirror_types::RemoteTransport;
use json_output::{MirrorReportJson, OperationMetadata};
use progress::TerminalProgress;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// ftpmirror - mirror a local directory to an FTP server
#[derive(Parser, Debug)]
#[command(
    name = "ftpmirror",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror a local directory to an FTP server",
    long_about = "ftpmirror uploads every local file that is new, has a different size or is newer\n\
                  than its remote copy, creating remote directories as needed. With --clean,\n\
                  remote files that have no local counterpart are deleted."
)]
struct Cli {
    /// FTP server host name or address
    host: String,

    /// Login name
    user: String,

    /// Password
    password: String,

    /// Remote directory to mirror into
    document_root: String,

    /// Mirror only these files, relative to the local root
    files: Vec<String>,

    /// Delete remote files without a local counterpart
    #[arg(short, long)]
    clean: bool,

    /// Exclude paths matching this regular expression (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "REGEX")]
    excludes: Vec<String>,

    /// Never delete remote paths matching this regular expression (repeatable)
    #[arg(short = 'k', long = "keep", value_name = "REGEX")]
    keeps: Vec<String>,

    /// Verbose mode: -v logs FTP commands, -vv also logs replies
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - warnings and errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// FTP control port
    #[arg(long)]
    port: Option<u16>,

    /// Local directory to mirror (default: current directory)
    #[arg(long, value_name = "DIR")]
    local_root: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a JSON report instead of the summary
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to PATH before mirroring
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,
}

impl Cli {
    /// Layer command line flags over the loaded configuration
    fn apply_to(&self, config: &mut MirrorConfig) {
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(local_root) = &self.local_root {
            config.sync.local_root = local_root.clone();
        }
        if self.clean {
            config.sync.clean = true;
        }
        config.sync.excludes.extend(self.excludes.iter().cloned());
        config.sync.keeps.extend(self.keeps.iter().cloned());
    }

    fn report_metadata(&self, config: &MirrorConfig) -> OperationMetadata {
        OperationMetadata::new(
            config.sync.local_root.display().to_string(),
            self.host.clone(),
            self.document_root.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    validate(&config).context("Invalid configuration")?;

    init_logging(&log_level(cli.verbose, cli.quiet, &config.logging.level))?;
    info!("ftpmirror v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &cli.save_config {
        ConfigLoader::save_to_file(&config, path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        if !cli.quiet && !cli.json {
            display::display_success(&format!("Configuration saved to {}", path.display()));
        }
    }

    let metadata = cli.report_metadata(&config);
    let outcome = mirror_command(&cli, &config).await;

    if cli.json {
        let report = match &outcome {
            Ok(result) => MirrorReportJson::success(metadata, result),
            Err(error) => MirrorReportJson::failure(metadata, error),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        outcome.map(|_| ())
    } else {
        let result = outcome?;
        if !cli.quiet {
            display::display_sync_result(&result);
        }
        Ok(())
    }
}

fn log_level(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        "warn".to_string()
    } else {
        match verbose {
            0 => configured.to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn build_request(cli: &Cli, config: &MirrorConfig) -> SyncRequest {
    let sync = &config.sync;
    let options = SyncOptions {
        clean: sync.clean,
        excludes: sync.excludes.clone(),
        keeps: sync.keeps.clone(),
        block_size: sync.block_size,
        marker_name: sync.marker_name.clone(),
    };

    SyncRequest::new(&sync.local_root, cli.document_root.as_str())
        .with_files(cli.files.clone())
        .with_options(options)
}

async fn mirror_command(cli: &Cli, config: &MirrorConfig) -> Result<SyncResult> {
    let progress = Arc::new(TerminalProgress::new(cli.quiet || cli.json, cli.verbose > 0));

    // Patterns are checked before connecting
    let engine = SyncEngine::new(build_request(cli, config))?.with_progress(progress.clone());
    debug!("Engine: {:?}", engine);

    let client_config = ClientConfig::new(
        cli.host.as_str(),
        cli.user.as_str(),
        cli.password.as_str(),
    )
    .with_connection(&config.connection);
    let client = FtpClient::connect(&client_config)
        .await
        .with_context(|| format!("Failed to connect to {}", client_config.address()))?;

    let mut session = MirrorSession::new(client);
    let outcome = engine.sync(&mut session).await;
    progress.finish_and_clear();

    let mut client = session.into_transport();
    if let Err(e) = client.quit().await {
        warn!("QUIT failed: {}", e);
    }

    let result = outcome.context("Mirror failed")?;
    info!(
        "Mirror finished: {} uploaded, {} deleted",
        result.stats.files_uploaded, result.stats.orphans_deleted
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ftpmirror", "ftp.example.com", "alice", "secret", "www"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positionals_and_flags() {
        let cli = parse(&["-c", "-x", "node_modules", "-x", r".*\.log", "-k", "uploads", "a.txt"]);

        assert_eq!(cli.host, "ftp.example.com");
        assert_eq!(cli.document_root, "www");
        assert!(cli.clean);
        assert_eq!(cli.excludes, vec!["node_modules", r".*\.log"]);
        assert_eq!(cli.keeps, vec!["uploads"]);
        assert_eq!(cli.files, vec!["a.txt"]);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let argv = ["ftpmirror", "h", "u", "p", "www", "-q", "-v"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[rstest]
    #[case(0, false, "info")]
    #[case(1, false, "debug")]
    #[case(2, false, "trace")]
    #[case(3, false, "trace")]
    #[case(0, true, "warn")]
    fn test_log_level(#[case] verbose: u8, #[case] quiet: bool, #[case] expected: &str) {
        assert_eq!(log_level(verbose, quiet, "info"), expected);
    }

    #[test]
    fn test_flags_extend_configuration() {
        let mut config = MirrorConfig::default();
        config.sync.excludes = vec!["cache".to_string()];
        config.sync.keeps = vec!["uploads".to_string()];

        let cli = parse(&["--port", "2121", "--local-root", "/srv/site", "-x", "tmp", "-c"]);
        cli.apply_to(&mut config);

        assert_eq!(config.connection.port, 2121);
        assert_eq!(config.sync.local_root, PathBuf::from("/srv/site"));
        assert!(config.sync.clean);
        assert_eq!(config.sync.excludes, vec!["cache", "tmp"]);
        assert_eq!(config.sync.keeps, vec!["uploads"]);
    }

    #[test]
    fn test_request_from_configuration() {
        let mut config = MirrorConfig::default();
        config.sync.block_size = 4096;
        let cli = parse(&["-c", "index.html"]);
        cli.apply_to(&mut config);

        let request = build_request(&cli, &config);

        assert_eq!(request.document_root, "www");
        assert_eq!(request.files, Some(vec!["index.html".to_string()]));
        assert!(request.options.clean);
        assert_eq!(request.options.block_size, 4096);
        assert_eq!(request.options.marker_name, ".timestamp");
    }

    #[test]
    fn test_no_files_means_whole_tree() {
        let cli = parse(&[]);
        let request = build_request(&cli, &MirrorConfig::default());
        assert_eq!(request.files, None);
    }
}
