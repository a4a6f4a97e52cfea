//! Settings loaded from `config.yaml`
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! A file that exists but does not parse is an error.

use crate::cache::DEFAULT_CAPACITY;
use crate::pipeline::DEFAULT_STAGE_TIMEOUT;
use crate::roles::{RoleError, RoleSet};
use crate::runner::{NotifyError, WebhookNotifier, DEFAULT_CONCURRENCY, DEFAULT_WEBHOOK_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const APP_NAME: &str = "offercraft";
pub const CONFIG_FILE: &str = "config.yaml";

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "offercraft=info"
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Where stage generations are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl GenerationSettings {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stage_timeout_secs: u64,
    pub cache_capacity: usize,
    pub batch_concurrency: usize,
    pub webhook_timeout_secs: u64,
    /// Directory of `<stage>.yaml` files overriding the built-in roles.
    pub roles_dir: Option<PathBuf>,
    pub generation: GenerationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT.as_secs(),
            cache_capacity: DEFAULT_CAPACITY,
            batch_concurrency: DEFAULT_CONCURRENCY,
            webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT.as_secs(),
            roles_dir: None,
            generation: GenerationSettings::default(),
        }
    }
}

impl Settings {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs.max(1))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs.max(1))
    }

    /// Webhook client bounded by `webhook_timeout_secs`.
    pub fn webhook_notifier(&self) -> Result<WebhookNotifier, NotifyError> {
        WebhookNotifier::new(self.webhook_timeout())
    }

    /// The configured roles directory, or the built-in roles.
    pub fn roles(&self) -> Result<RoleSet, RoleError> {
        match &self.roles_dir {
            Some(dir) => RoleSet::load_dir(dir),
            None => RoleSet::builtin(),
        }
    }
}

/// `<data dir>/offercraft/config.yaml`
pub fn default_config_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join(APP_NAME).join(CONFIG_FILE)
}
