//! Configuration loader
//!
//! Reads `config.toml` from the XDG config directory. A relative
//! `socket_path` is taken relative to the file that names it, and the
//! `MEDIA_LISTENER_SOCKET` environment variable overrides the file when
//! loading from the default location.

use std::path::{Path, PathBuf};

use media_listener_utils::{config_file, ClientError, Result};

use super::ClientConfig;

/// Environment variable overriding `socket_path`
pub const SOCKET_ENV: &str = "MEDIA_LISTENER_SOCKET";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<ClientConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(ClientConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<ClientConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| ClientError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config = Self::parse(&content, path)?;
        if config.socket_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.socket_path = dir.join(&config.socket_path);
            }
        }
        tracing::debug!(
            path = %path.display(),
            socket = %config.socket_path.display(),
            "Loaded client config"
        );
        Ok(config)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<ClientConfig> {
        toml::from_str(content).map_err(|e| ClientError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides, reading variables through `lookup`
    ///
    /// An empty value is ignored.
    pub fn apply_overrides(
        mut config: ClientConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClientConfig {
        if let Some(socket) = lookup(SOCKET_ENV).filter(|value| !value.is_empty()) {
            config.socket_path = PathBuf::from(socket);
        }
        config
    }

    /// Validate configuration
    pub fn validate(config: &ClientConfig) -> Result<()> {
        if config.socket_path.as_os_str().is_empty() {
            return Err(ClientError::config("socket_path must not be empty"));
        }

        if config.channel_capacity == 0 {
            return Err(ClientError::config("channel_capacity must be at least 1"));
        }

        if config.max_frame_size == 0 {
            return Err(ClientError::config("max_frame_size must be at least 1"));
        }

        if config.read_buffer_size == 0 {
            return Err(ClientError::config("read_buffer_size must be at least 1"));
        }

        if config.backoff.base_ms == 0 {
            return Err(ClientError::config("backoff.base_ms must be greater than 0"));
        }

        if config.backoff.cap_ms < config.backoff.base_ms {
            return Err(ClientError::config(
                "backoff.cap_ms must not be less than backoff.base_ms",
            ));
        }

        Ok(())
    }

    /// Load from the default location, apply `MEDIA_LISTENER_SOCKET` and validate
    pub fn load_and_validate() -> Result<ClientConfig> {
        let config = Self::apply_overrides(Self::load()?, |key| std::env::var(key).ok());
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load `path` and validate it; the environment is not consulted
    pub fn load_and_validate_from_path(path: &Path) -> Result<ClientConfig> {
        let config = Self::load_from_path(path)?;
        Self::validate(&config)?;
        Ok(config)
    }
}
