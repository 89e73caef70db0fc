use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default chat-completion endpoint (OpenAI compatible mode)
pub const DEFAULT_API_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default model identifier
pub const DEFAULT_MODEL_NAME: &str = "qwen-plus";

/// Environment variable consulted when the config file has no token
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Config file name looked up in the installation root
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for the file renamer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API access settings
    #[serde(default)]
    pub base_config: BaseConfig,

    /// Batch rename behaviour
    #[serde(default)]
    pub rename: RenameConfig,
}

/// API access settings, read from the `[base_config]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseConfig {
    /// API token; falls back to `DASHSCOPE_API_KEY` when unset
    pub api_token: Option<String>,

    /// Base URL of the OpenAI compatible endpoint
    pub api_url: Option<String>,

    /// Model used when the caller does not override it
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameConfig {
    /// Abort the remaining batch on the first failed file
    #[serde(default = "default_stop_on_first_error")]
    pub stop_on_first_error: bool,
}

fn default_stop_on_first_error() -> bool {
    true
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            stop_on_first_error: default_stop_on_first_error(),
        }
    }
}

impl BaseConfig {
    /// Configured base URL, or the default endpoint
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Configured model, or the default model
    pub fn model_name(&self) -> &str {
        self.model_name
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL_NAME)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// There is no fallback: a missing or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let config_str = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load `config.toml` from the installation root
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::default_path())
    }

    /// Location used when no config path is given on the command line
    pub fn default_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_FILE)
    }

    pub fn with_api_token(mut self, api_token: Option<String>) -> Self {
        self.base_config.api_token = api_token;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.base_config.api_url = Some(api_url.into());
        self
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.base_config.model_name = Some(model_name.into());
        self
    }

    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.rename.stop_on_first_error = stop;
        self
    }
}

/// Pick the API credential: config value first, then the environment.
///
/// Blank values count as unset at both levels.
pub fn resolve_credential(base: &BaseConfig, env_token: Option<String>) -> Option<String> {
    base.api_token
        .clone()
        .filter(|token| !token.trim().is_empty())
        .or_else(|| env_token.filter(|token| !token.trim().is_empty()))
}

/// Read the fallback credential from `DASHSCOPE_API_KEY`
pub fn credential_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}
