//! Central repository for file names, timeouts and endpoint defaults
//!
//! Grouped by concern so call sites read as `cache::DB_ARTIFACT`,
//! `timeouts::COMMAND` and so on.

use std::time::Duration;

/// On-disk cache layout
pub mod cache {
    /// Directory under the home directory holding all snapshots
    pub const ROOT_DIR_NAME: &str = ".wpsnapshots";

    /// Environment variable overriding the cache root
    pub const ROOT_ENV_VAR: &str = "WPSNAPSHOTS_DIR";

    /// Compressed database dump
    pub const DB_ARTIFACT: &str = "data.sql.gz";

    /// Compressed file tree archive
    pub const FILES_ARTIFACT: &str = "files.tar.gz";

    /// Snapshot metadata written next to the artifacts
    pub const META_FILE: &str = "meta.json";

    /// Configuration file inside the cache root
    pub const CONFIG_FILE: &str = "config.toml";

    /// Suffix for files still being written
    pub const PARTIAL_SUFFIX: &str = ".partial";
}

/// External process timeouts
pub mod timeouts {
    use super::Duration;

    /// Default deadline for a single export command
    pub const COMMAND: Duration = Duration::from_secs(3600);

    /// Deadline for short queries such as table enumeration
    pub const QUERY: Duration = Duration::from_secs(60);

    /// Version-check HTTP request timeout
    pub const LOOKUP: Duration = Duration::from_secs(15);

    /// Archive download timeout
    pub const DOWNLOAD: Duration = Duration::from_secs(600);
}

/// Export tool settings
pub mod export {
    /// Environment variable the mysql clients read the password from
    pub const PASSWORD_ENV_VAR: &str = "MYSQL_PWD";

    /// Interpreter-lookup prefix used on non-Windows platforms
    pub const ENV_PREFIX: &str = "/usr/bin/env";

    /// Row limit applied to every table of a small snapshot
    pub const SMALL_ROW_LIMIT: u32 = 300;

    /// Default WordPress table prefix
    pub const DEFAULT_TABLE_PREFIX: &str = "wp_";
}

/// WordPress download endpoints
pub mod download {
    pub const NIGHTLY_URL: &str = "https://wordpress.org/nightly-builds/wordpress-latest.zip";

    pub const VERSION_CHECK_URL: &str = "https://api.wordpress.org/core/version-check/1.7/";

    pub const DEFAULT_LOCALE: &str = "en_US";

    /// Attempts for a `latest` lookup during provisioning
    pub const MAX_LOOKUP_ATTEMPTS: u32 = 3;
}
