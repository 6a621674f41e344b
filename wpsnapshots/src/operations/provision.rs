// File: wpsnapshots/src/operations/provision.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::constants::download;
use crate::errors::LookupError;
use crate::services::config_editor::{rewrite_config, ConfigValue};
use crate::services::download::DownloadUrlResolver;

const CONFIG_FILE: &str = "wp-config.php";
const FALLBACK_ARCHIVE_NAME: &str = "wordpress.tar.gz";

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub version: String,
    pub locale: String,
    pub target_dir: PathBuf,
    /// Template for `wp-config.php`; no config is written without one
    pub config_template: Option<PathBuf>,
    pub constants: Vec<(String, ConfigValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub url: String,
    pub archive: PathBuf,
    pub bytes: u64,
    pub config: Option<PathBuf>,
}

/// Downloads a WordPress release and writes its environment config.
pub struct Provisioner {
    resolver: DownloadUrlResolver,
    retry_delay: Duration,
}

impl Provisioner {
    pub fn new(resolver: DownloadUrlResolver) -> Self {
        Self {
            resolver,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Resolve the archive URL, retrying `latest` lookups.
    pub async fn resolve_url(&self, version: &str, locale: &str) -> Result<String, LookupError> {
        let attempts = if version.trim() == "latest" {
            download::MAX_LOOKUP_ATTEMPTS
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.resolver.resolve(version, locale).await {
                Ok(url) => return Ok(url),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Version lookup attempt {}/{} failed: {}",
                        attempt, attempts, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn prepare_environment(&self, request: &ProvisionRequest) -> Result<ProvisionOutcome> {
        info!(
            "Preparing WordPress {} ({}) in {}",
            request.version,
            request.locale,
            request.target_dir.display()
        );

        // Step 1: Resolve download URL
        let url = self
            .resolve_url(&request.version, &request.locale)
            .await
            .context("Failed to resolve WordPress download URL")?;
        info!("✓ Resolved {}", url);

        // Step 2: Download archive
        tokio::fs::create_dir_all(&request.target_dir)
            .await
            .with_context(|| format!("Failed to create {}", request.target_dir.display()))?;
        let archive = request.target_dir.join(archive_name(&url));
        let bytes = self
            .resolver
            .download_to(&url, &archive)
            .await
            .with_context(|| format!("Failed to download {}", url))?;
        info!(
            "✓ Archive saved to {} ({:.1} MB)",
            archive.display(),
            bytes as f64 / 1024.0 / 1024.0
        );

        // Step 3: Write environment config
        let config = match &request.config_template {
            Some(template) => {
                if !template.is_file() {
                    return Err(anyhow!("Config template not found: {}", template.display()));
                }
                let destination = request.target_dir.join(CONFIG_FILE);
                rewrite_config(template, &destination, &request.constants).await?;
                info!("✓ {} written", destination.display());
                Some(destination)
            }
            None => None,
        };

        Ok(ProvisionOutcome {
            url,
            archive,
            bytes,
            config,
        })
    }
}

/// Last path segment of `url`, ignoring any query string.
fn archive_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_ARCHIVE_NAME)
        .to_string()
}
