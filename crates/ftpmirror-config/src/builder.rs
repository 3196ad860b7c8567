//! Configuration builder for layered configuration loading

use crate::{ConfigError, ConfigResult, MirrorConfig};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Log levels accepted in the configuration
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration builder for loading configuration from multiple sources
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Defaults,
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add default configuration values
    pub fn add_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Add a configuration file source; missing files are skipped
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(mut self) -> ConfigResult<MirrorConfig> {
        // Defaults are always the base layer
        let defaults_value = serde_yaml::to_value(MirrorConfig::default())
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .separator(&self.env_separator)
                            .try_parsing(true)
                            // Pattern lists arrive comma separated; other keys stay scalar
                            .list_separator(",")
                            .with_list_parse_key("sync.excludes")
                            .with_list_parse_key("sync.keeps"),
                    );
                }
                ConfigSource::Defaults => {
                    // Already handled above
                }
            }
        }

        let config: MirrorConfig = self.inner.build()?.try_deserialize()?;
        validate(&config)?;
        Ok(config)
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Check value ranges that the type system does not
pub fn validate(config: &MirrorConfig) -> ConfigResult<()> {
    if config.connection.port == 0 {
        return Err(ConfigError::validation("Port must be greater than 0"));
    }

    if config.connection.connect_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Connect timeout must be greater than 0",
        ));
    }

    if config.sync.block_size == 0 {
        return Err(ConfigError::validation(
            "Block size must be greater than 0",
        ));
    }

    if config.sync.marker_name.is_empty() || config.sync.marker_name.contains('/') {
        return Err(ConfigError::validation(
            "Marker name must be a plain file name",
        ));
    }

    for pattern in config.sync.excludes.iter().chain(&config.sync.keeps) {
        if let Err(e) = Regex::new(&format!("^(?:{})$", pattern)) {
            return Err(ConfigError::validation(format!(
                "Invalid pattern '{}': {}",
                pattern, e
            )));
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::validation(
            "Log level must be one of: trace, debug, info, warn, error",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_config(extension: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(extension).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().add_defaults().build().unwrap();
        assert_eq!(config, MirrorConfig::default());
    }

    #[test]
    fn test_builder_yaml_file() {
        let file = temp_config(
            ".yaml",
            r#"
connection:
  port: 2121
sync:
  clean: true
  excludes:
    - "node_modules"
    - '.*\.log'
"#,
        );

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(file.path())
            .build()
            .unwrap();

        assert_eq!(config.connection.port, 2121);
        assert!(config.sync.clean);
        assert_eq!(config.sync.excludes, vec!["node_modules", r".*\.log"]);
        assert_eq!(config.sync.block_size, 32760);
    }

    #[test]
    fn test_builder_toml_file() {
        let file = temp_config(
            ".toml",
            r#"
[sync]
keeps = ["uploads"]
block_size = 8192

[logging]
level = "debug"
"#,
        );

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(file.path())
            .build()
            .unwrap();

        assert_eq!(config.sync.keeps, vec!["uploads"]);
        assert_eq!(config.sync.block_size, 8192);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file("/nonexistent/ftpmirror.toml")
            .build()
            .unwrap();
        assert_eq!(config.connection.port, 21);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = temp_config(".toml", "[connection]\nport = 2121\n");
        std::env::set_var("FTPMIRROR_BUILDER_TEST__CONNECTION__PORT", "990");

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(file.path())
            .add_env_prefix("FTPMIRROR_BUILDER_TEST")
            .build()
            .unwrap();

        std::env::remove_var("FTPMIRROR_BUILDER_TEST__CONNECTION__PORT");
        assert_eq!(config.connection.port, 990);
    }

    #[test]
    fn test_environment_pattern_lists() {
        std::env::set_var("FTPMIRROR_LIST_TEST__SYNC__EXCLUDES", r"node_modules,.*\.log");
        std::env::set_var("FTPMIRROR_LIST_TEST__SYNC__KEEPS", "uploads");
        std::env::set_var("FTPMIRROR_LIST_TEST__SYNC__MARKER_NAME", ".stamp,v2");

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_env_prefix("FTPMIRROR_LIST_TEST")
            .build();

        std::env::remove_var("FTPMIRROR_LIST_TEST__SYNC__EXCLUDES");
        std::env::remove_var("FTPMIRROR_LIST_TEST__SYNC__KEEPS");
        std::env::remove_var("FTPMIRROR_LIST_TEST__SYNC__MARKER_NAME");

        let config = config.unwrap();
        assert_eq!(config.sync.excludes, vec!["node_modules", r".*\.log"]);
        assert_eq!(config.sync.keeps, vec!["uploads"]);
        assert_eq!(config.sync.marker_name, ".stamp,v2");
    }

    #[test]
    fn test_builder_validation() {
        let file = temp_config(".toml", "[sync]\nblock_size = 0\n");

        let result = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(file.path())
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Block size must be greater than 0"));
    }

    #[rstest]
    #[case::zero_port(|c: &mut MirrorConfig| c.connection.port = 0)]
    #[case::zero_timeout(|c: &mut MirrorConfig| c.connection.connect_timeout_secs = 0)]
    #[case::zero_block(|c: &mut MirrorConfig| c.sync.block_size = 0)]
    #[case::empty_marker(|c: &mut MirrorConfig| c.sync.marker_name = String::new())]
    #[case::nested_marker(|c: &mut MirrorConfig| c.sync.marker_name = "a/b".to_string())]
    #[case::bad_exclude(|c: &mut MirrorConfig| c.sync.excludes = vec!["[".to_string()])]
    fn test_validation_rejects(#[case] mutate: fn(&mut MirrorConfig)) {
        let mut config = MirrorConfig::default();
        mutate(&mut config);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = MirrorConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut config = MirrorConfig::default();
        config.sync.keeps = vec!["uploads(".to_string()];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("uploads("));
    }
}
