// Layered settings for the wizard client and the reference backend

//! # Configuration
//!
//! [`Settings`] are assembled from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`pat-agent.toml` unless another path is given)
//! 3. environment variables prefixed `PAT_AGENT_`, with `__` between
//!    section and key (`PAT_AGENT_SERVER__PORT=5001`,
//!    `PAT_AGENT_LLM__PROVIDER=anthropic`)
//!
//! API keys are never part of the settings; they are read from the
//! provider's own variable (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::providers::{api_key_env_var, ProviderSettings};
use crate::llm::LLMProviderType;
use crate::server::{WizardServerConfig, DEFAULT_PORT};
use crate::transport::ClientConfig;
use crate::{PatAgentError, Result};

/// File read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "pat-agent.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PAT_AGENT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub client: ClientConfig,
    pub llm: LlmSettings,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            client: ClientConfig::default(),
            llm: LlmSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Backend listener and data files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors: bool,
    /// Directory holding one JSON history file per channel; in-memory when unset
    pub history_dir: Option<PathBuf>,
    pub algorithm_db: Option<PathBuf>,
    pub example_db: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors: true,
            history_dir: None,
            algorithm_db: None,
            example_db: None,
        }
    }
}

/// Which model answers prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            max_tokens: None,
            timeout_seconds: None,
        }
    }
}

impl Settings {
    /// Load defaults, then `path` (or `pat-agent.toml`) if it exists, then the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
        let defaults = config::Config::try_from(&Settings::default()).map_err(config_error)?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(file).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)
    }

    /// Default log filter; `verbose` raises it to debug
    pub fn log_filter(&self, verbose: bool) -> &str {
        if verbose {
            "debug"
        } else {
            &self.log_level
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        self.client.clone()
    }

    pub fn server_config(&self) -> WizardServerConfig {
        WizardServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            cors_enabled: self.server.cors,
        }
    }
}

impl LlmSettings {
    pub fn provider_type(&self) -> Result<LLMProviderType> {
        Ok(self.provider.parse::<LLMProviderType>()?)
    }

    /// Provider settings with the key read from the provider's environment variable.
    ///
    /// `Ok(None)` when the variable is unset or empty.
    pub fn provider_settings_from_env(&self) -> Result<Option<ProviderSettings>> {
        let provider_type = self.provider_type()?;
        let var = api_key_env_var(&provider_type).ok_or_else(|| {
            PatAgentError::Configuration(format!("unsupported LLM provider: {}", provider_type))
        })?;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(self.provider_settings(key))),
            _ => Ok(None),
        }
    }

    pub fn provider_settings(&self, api_key: impl Into<String>) -> ProviderSettings {
        let mut settings = ProviderSettings::new(api_key);
        settings.base_url = self.base_url.clone();
        settings.model = self.model.clone();
        settings.timeout_seconds = self.timeout_seconds;
        settings
    }
}

fn config_error(err: config::ConfigError) -> PatAgentError {
    PatAgentError::Configuration(err.to_string())
}
