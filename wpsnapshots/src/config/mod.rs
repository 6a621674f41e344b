// File: wpsnapshots/src/config/mod.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{cache, download, timeouts};
use crate::services::cache::{default_root, CacheDirectoryManager};
use crate::services::paths;
use crate::types::Author;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides where snapshot slots are created
    pub cache_dir: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub default_repository: String,
    pub command_timeout_seconds: u64,
    pub version_check_url: String,
    pub locale: String,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mysqldump: String,
    pub mysql: String,
    pub tar: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            author_name: None,
            author_email: None,
            default_repository: "10up".to_string(),
            command_timeout_seconds: timeouts::COMMAND.as_secs(),
            version_check_url: download::VERSION_CHECK_URL.to_string(),
            locale: download::DEFAULT_LOCALE.to_string(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mysqldump: "mysqldump".to_string(),
            mysql: "mysql".to_string(),
            tar: "tar".to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the default cache root. A missing file yields
    /// the defaults.
    pub async fn load_default() -> Result<Self> {
        let root = default_root().ok_or_else(|| anyhow!("Unable to resolve home directory"))?;
        Self::load(&root.join(cache::CONFIG_FILE)).await
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.command_timeout_seconds == 0 {
            return Err(anyhow!("command_timeout_seconds must be greater than zero"));
        }
        for (name, value) in [
            ("tools.mysqldump", &self.tools.mysqldump),
            ("tools.mysql", &self.tools.mysql),
            ("tools.tar", &self.tools.tar),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{} must not be empty", name));
            }
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn author(&self) -> Option<Author> {
        self.author_name.as_ref().map(|name| Author {
            name: name.clone(),
            email: self.author_email.clone(),
        })
    }

    pub fn cache_root(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(paths::normalize(dir))),
            _ => default_root().ok_or_else(|| anyhow!("Unable to resolve home directory")),
        }
    }

    pub fn cache(&self) -> Result<CacheDirectoryManager> {
        Ok(CacheDirectoryManager::new(self.cache_root()?))
    }
}
