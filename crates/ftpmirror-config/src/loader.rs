//! Configuration loader utilities

use crate::{ConfigBuilder, ConfigError, ConfigResult, MirrorConfig};
use std::path::{Path, PathBuf};

/// Prefix of environment variables read by the loader
pub const ENV_PREFIX: &str = "FTPMIRROR";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first file found in the default locations
    pub fn load_default() -> ConfigResult<MirrorConfig> {
        let mut builder = ConfigBuilder::new().add_defaults();

        if let Some(path) = Self::config_exists() {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from a specific file, which must exist
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MirrorConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            });
        }

        ConfigBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Load from `path` when given, from the default locations otherwise
    pub fn load(path: Option<&Path>) -> ConfigResult<MirrorConfig> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Save configuration to a file, choosing the format from the extension
    pub fn save_to_file<P: AsRef<Path>>(config: &MirrorConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(config)?,
            _ => serde_yaml::to_string(config)?,
        };

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get default configuration file paths in order of preference
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("ftpmirror.toml"),
            PathBuf::from("ftpmirror.yaml"),
            PathBuf::from("ftpmirror.yml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("ftpmirror");
            paths.push(app_dir.join("config.toml"));
            paths.push(app_dir.join("config.yaml"));
            paths.push(app_dir.join("config.yml"));
        }

        paths
    }

    /// First existing configuration file in the default locations
    pub fn config_exists() -> Option<PathBuf> {
        Self::default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/ftpmirror.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = MirrorConfig::default();
        config.sync.clean = true;
        config.sync.keeps = vec!["uploads".to_string()];

        for name in ["saved.toml", "saved.yaml"] {
            let path = temp_dir.path().join(name);
            ConfigLoader::save_to_file(&config, &path).unwrap();
            let loaded = ConfigLoader::load_from_file(&path).unwrap();
            assert_eq!(loaded.sync, config.sync);
        }
    }

    #[test]
    fn test_default_paths_prefer_current_directory() {
        let paths = ConfigLoader::default_config_paths();
        assert_eq!(paths[0], PathBuf::from("ftpmirror.toml"));
    }
}
