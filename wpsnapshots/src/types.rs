// File: wpsnapshots/src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{cache, export};
use crate::errors::ValidationError;
use crate::services::commands::HostSpec;

// === REQUEST STRUCTURES ===

#[derive(Clone, Deserialize)]
pub struct DbConnection {
    /// Raw `host[:port-or-socket]` string
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

fn default_table_prefix() -> String {
    export::DEFAULT_TABLE_PREFIX.to_string()
}

impl fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRequest {
    pub project: String,
    pub description: String,
    pub path: String,
    pub database: Option<DbConnection>,
    #[serde(default = "default_true")]
    pub contains_db: bool,
    #[serde(default = "default_true")]
    pub contains_files: bool,
    #[serde(default)]
    pub exclude_paths: BTreeSet<String>,
    #[serde(default)]
    pub small: bool,
    #[serde(default)]
    pub no_scrub: bool,
    pub repository: String,
}

fn default_true() -> bool {
    true
}

impl SnapshotRequest {
    /// Check the request and return it with the slug lowercased and the
    /// description trimmed.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        let slug = self.project.trim();
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidSlug {
                slug: self.project.clone(),
            });
        }
        self.project = slug.to_lowercase();

        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        self.description = description.to_string();

        if !self.contains_db && !self.contains_files {
            return Err(ValidationError::NothingToSnapshot);
        }

        if self.contains_db {
            let db = self.database.as_ref().ok_or(ValidationError::MissingDatabase)?;
            let prefix = &db.table_prefix;
            if prefix.is_empty()
                || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(ValidationError::InvalidTablePrefix {
                    prefix: prefix.clone(),
                });
            }
            HostSpec::parse(&db.host)?;
        }

        Ok(self)
    }

    pub fn expected_artifacts(&self) -> Vec<Artifact> {
        Artifact::expected_for(self.contains_db, self.contains_files)
    }
}

// === CACHE STRUCTURES ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Database,
    Files,
}

impl Artifact {
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Database => cache::DB_ARTIFACT,
            Artifact::Files => cache::FILES_ARTIFACT,
        }
    }

    pub fn expected_for(contains_db: bool, contains_files: bool) -> Vec<Artifact> {
        let mut artifacts = Vec::new();
        if contains_db {
            artifacts.push(Artifact::Database);
        }
        if contains_files {
            artifacts.push(Artifact::Files);
        }
        artifacts
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: String,
    pub path: PathBuf,
    pub artifacts: Vec<Artifact>,
}

impl CacheEntry {
    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        self.path.join(artifact.file_name())
    }
}

/// Contents of `meta.json` in each cache slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub id: String,
    pub project: String,
    pub description: String,
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    pub contains_db: bool,
    pub contains_files: bool,
    pub small: bool,
    pub scrub_requested: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_size_bytes: Option<u64>,
}

impl SnapshotMeta {
    pub fn from_request(id: &str, request: &SnapshotRequest, author: Option<Author>) -> Self {
        Self {
            id: id.to_string(),
            project: request.project.clone(),
            description: request.description.clone(),
            repository: request.repository.clone(),
            author,
            contains_db: request.contains_db,
            contains_files: request.contains_files,
            small: request.small,
            scrub_requested: !request.no_scrub,
            created_at: Utc::now(),
            db_size_bytes: None,
            files_size_bytes: None,
        }
    }

    pub fn expected_artifacts(&self) -> Vec<Artifact> {
        Artifact::expected_for(self.contains_db, self.contains_files)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
