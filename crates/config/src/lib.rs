use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use core_types::UiLanguage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const BASE_URL_ENV: &str = "DOCCHAT_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("docchat/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    #[serde(default = "default_sent_indicator_ms")]
    pub sent_indicator_ms: u64,
}

impl ChatConfig {
    pub fn sent_indicator(&self) -> Duration {
        Duration::from_millis(self.sent_indicator_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            sent_indicator_ms: default_sent_indicator_ms(),
        }
    }
}

const fn default_sent_indicator_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub schema_version: u32,
    pub language: UiLanguage,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            language: UiLanguage::EnUs,
            backend: BackendConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("backend.base_url must be an http(s) url, got `{url}`");
        }
        Ok(())
    }

    /// Applies environment overrides on top of the file contents.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            info!(base_url = %url, "backend url overridden from environment");
            self.backend.base_url = url.trim().to_string();
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("docchat");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, creating it with defaults when missing. Environment
    /// overrides are applied after saving so they never reach disk.
    pub fn load_or_init(&self) -> Result<ClientConfig> {
        let mut config = if self.path.exists() {
            let raw = fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read {}", self.path.display()))?;
            let mut config: ClientConfig =
                serde_json::from_str(&raw).context("failed to parse client config json")?;
            self.migrate(&mut config);
            self.save(&config)?;
            config
        } else {
            let config = ClientConfig::default();
            self.save(&config)?;
            config
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut ClientConfig) {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating client config schema"
        );

        if config.backend.base_url.trim().is_empty() {
            config.backend = BackendConfig::default();
        }
        config.schema_version = CURRENT_SCHEMA_VERSION;
    }
}
