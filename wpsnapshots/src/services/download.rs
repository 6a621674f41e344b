// File: wpsnapshots/src/services/download.rs
use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::constants::{cache, download, timeouts};
use crate::errors::LookupError;

#[derive(Debug, Deserialize)]
struct VersionCheckResponse {
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    download: Option<String>,
}

/// Maps a WordPress version and locale to an archive download URL.
#[derive(Debug, Clone)]
pub struct DownloadUrlResolver {
    client: Client,
    version_check_url: String,
}

impl DownloadUrlResolver {
    pub fn new(version_check_url: impl Into<String>) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeouts::LOOKUP).build()?;
        Ok(Self {
            client,
            version_check_url: version_check_url.into(),
        })
    }

    pub async fn resolve(&self, version: &str, locale: &str) -> Result<String, LookupError> {
        let version = version.trim();
        let locale = match locale.trim() {
            "" => download::DEFAULT_LOCALE,
            other => other,
        };

        match version {
            "nightly" => Ok(download::NIGHTLY_URL.to_string()),
            "latest" => self.lookup_latest(locale).await,
            _ => Ok(versioned_url(version, locale)),
        }
    }

    async fn lookup_latest(&self, locale: &str) -> Result<String, LookupError> {
        debug!("Looking up latest version for locale {}", locale);

        let response = self
            .client
            .get(&self.version_check_url)
            .query(&[("locale", locale)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
            });
        }

        let body: VersionCheckResponse = response.json().await?;
        let url = body
            .offers
            .into_iter()
            .next()
            .and_then(|offer| offer.download)
            .filter(|url| !url.trim().is_empty())
            .ok_or(LookupError::MissingOffer)?;

        info!("Latest download for {}: {}", locale, url);
        Ok(url)
    }

    /// Stream `url` into `destination`, renaming into place once complete.
    pub async fn download_to(&self, url: &str, destination: &Path) -> anyhow::Result<u64> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeouts::DOWNLOAD)
            .send()
            .await?
            .error_for_status()?;

        let mut partial = destination.as_os_str().to_owned();
        partial.push(cache::PARTIAL_SUFFIX);
        let partial = std::path::PathBuf::from(partial);

        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written = 0u64;
        let result = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        drop(file);
        tokio::fs::rename(&partial, destination).await?;

        info!("Downloaded {} ({} bytes) to {}", url, written, destination.display());
        Ok(written)
    }
}

fn versioned_url(version: &str, locale: &str) -> String {
    if locale == download::DEFAULT_LOCALE {
        return format!("https://wordpress.org/wordpress-{}.tar.gz", version);
    }
    let subdomain = locale
        .split('_')
        .next()
        .unwrap_or(locale)
        .to_lowercase();
    format!(
        "https://{}.wordpress.org/wordpress-{}-{}.tar.gz",
        subdomain, version, locale
    )
}
