//! Error types for snapshot assembly
//!
//! Each concern gets its own enum so callers can decide what is recoverable:
//! validation and lookup failures go back to the caller, cache and process
//! failures end the current snapshot.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for snapshot creation
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Request rejected before any work started
    #[error("Invalid snapshot request: {0}")]
    Validation(#[from] ValidationError),

    /// Cache directory could not be prepared or written
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// External export tool failed
    #[error("Export failed: {0}")]
    Spawn(#[from] SpawnError),

    /// Other errors with context
    #[error("{0}")]
    Other(String),
}

impl SnapshotError {
    /// Status the binary should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SnapshotError::Spawn(e) => e.exit_code(),
            _ => 1,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, SnapshotError::Validation(_))
    }
}

/// Request validation error variants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("project slug '{slug}' may only contain letters, numbers, '-' and '_'")]
    InvalidSlug { slug: String },

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("snapshot must contain the database, the files, or both")]
    NothingToSnapshot,

    #[error("database connection is required when the snapshot contains the database")]
    MissingDatabase,

    #[error("table prefix '{prefix}' may only contain letters, numbers and '_'")]
    InvalidTablePrefix { prefix: String },

    #[error("port in database host '{host}' must be between 0 and 65535")]
    InvalidPort { host: String },

    #[error("source path {path} is not a directory")]
    MissingSource { path: String },

    #[error("'{id}' is not a valid snapshot identifier")]
    InvalidIdentifier { id: String },
}

/// Cache directory error variants
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to create a directory
    #[error("failed to create {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory exists but the current user cannot write to it
    #[error("{} is not writable: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a file inside the cache failed
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a file inside the cache failed
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata file could not be parsed
    #[error("invalid metadata in {}: {reason}", path.display())]
    InvalidMeta { path: PathBuf, reason: String },

    /// Export finished but not every expected artifact is present
    #[error("snapshot {id} is incomplete after export")]
    Incomplete { id: String },

    /// Identifier cannot be used as a slot directory name
    #[error(transparent)]
    InvalidSlot(#[from] ValidationError),
}

/// External process error variants
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Process could not be started at all
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Process ran and exited with a non-zero status
    #[error("{program} exited with status {code}")]
    Failed { program: String, code: i32 },

    /// Process did not finish before the deadline and was killed
    #[error("{program} timed out after {}s", after.as_secs())]
    TimedOut { program: String, after: Duration },

    /// Output redirect target could not be opened
    #[error("failed to open output {}: {source}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpawnError {
    /// Non-zero status for terminating the whole program on this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SpawnError::Failed { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }
}

/// Download URL lookup error variants
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("version check request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("version check returned HTTP {status}")]
    Status { status: u16 },

    #[error("version check response has no download offer")]
    MissingOffer,
}

/// Config template rewrite error variants
#[derive(Debug, Error)]
pub enum ConfigRewriteError {
    #[error("failed to read template {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{name}' is not a valid constant name")]
    InvalidConstant { name: String },

    #[error("value for '{name}' must fit on a single line")]
    MultilineValue { name: String },
}
