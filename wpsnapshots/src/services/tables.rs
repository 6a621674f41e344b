// File: wpsnapshots/src/services/tables.rs
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::constants::timeouts;
use crate::errors::SpawnError;
use crate::services::commands::{build_export_command, ArgValue, Credentials, HostSpec};
use crate::services::process::ProcessRunner;
use crate::types::DbConnection;

/// Source of the table names that belong to a site.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>, SpawnError>;
}

/// Enumerates tables through the `mysql` command-line client.
pub struct MysqlTableSource {
    program: String,
    connection: DbConnection,
    runner: ProcessRunner,
}

impl MysqlTableSource {
    pub fn new(program: impl Into<String>, connection: DbConnection, runner: ProcessRunner) -> Self {
        Self {
            program: program.into(),
            connection,
            runner: runner.with_deadline(timeouts::QUERY),
        }
    }
}

#[async_trait]
impl TableSource for MysqlTableSource {
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>, SpawnError> {
        let host = match HostSpec::parse(&self.connection.host) {
            Ok(host) => host,
            Err(e) => {
                warn!("{}, exporting all tables", e);
                return Ok(Vec::new());
            }
        };
        let query = format!("SHOW TABLES LIKE '{}%'", escape_like(prefix));
        let spec = build_export_command(
            &self.program,
            &host,
            &Credentials {
                user: self.connection.user.clone(),
                password: self.connection.password.clone(),
            },
            vec![
                ("batch".to_string(), ArgValue::Flag),
                ("skip-column-names".to_string(), ArgValue::Flag),
                ("execute".to_string(), ArgValue::Value(query)),
            ],
            vec![self.connection.name.clone()],
            None,
        );

        // A missing database is an expected first-run state, not a failure.
        let output = self.runner.capture(&spec, false).await?;
        if output.code != 0 {
            warn!(
                "Could not list tables in {} (exit code {}), exporting all tables",
                self.connection.name, output.code
            );
            return Ok(Vec::new());
        }

        let tables = parse_table_list(&output.stdout);
        debug!("Found {} tables with prefix {}", tables.len(), prefix);
        Ok(tables)
    }
}

/// Escape LIKE wildcards so `wp_` matches a literal underscore.
pub fn escape_like(prefix: &str) -> String {
    prefix.replace('\\', "\\\\").replace('_', "\\_").replace('%', "\\%")
}

pub fn parse_table_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("wp_"), "wp\\_");
        assert_eq!(escape_like("site2_wp_"), "site2\\_wp\\_");
    }

    #[test]
    fn test_parse_table_list_skips_blank_lines() {
        assert_eq!(
            parse_table_list("wp_options\n\nwp_posts\r\n"),
            vec!["wp_options".to_string(), "wp_posts".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_query_falls_back_to_all_tables() {
        let connection = DbConnection {
            host: "localhost".to_string(),
            user: "wp".to_string(),
            password: String::new(),
            name: "missing".to_string(),
            table_prefix: "wp_".to_string(),
        };
        // `false` accepts any arguments and exits 1
        let source = MysqlTableSource::new("false", connection, ProcessRunner::default());
        assert!(source.list_tables("wp_").await.unwrap().is_empty());
    }
}
