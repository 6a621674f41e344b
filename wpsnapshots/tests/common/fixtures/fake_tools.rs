//! Stand-ins for the mysql client tools

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use wpsnapshots::errors::SpawnError;
use wpsnapshots::services::tables::TableSource;

pub const FAKE_DUMP: &str = "CREATE TABLE `wp_options` (`option_id` bigint);\n\
INSERT INTO `wp_options` VALUES (1);\n";

/// Shell script that records its arguments and password, prints a small
/// dump and exits with a fixed status.
pub struct FakeDumpTool {
    pub program: PathBuf,
    pub args_log: PathBuf,
    pub env_log: PathBuf,
}

impl FakeDumpTool {
    pub fn install(dir: &Path, exit_code: i32) -> Self {
        let program = dir.join("fake-mysqldump");
        let args_log = dir.join("mysqldump.args");
        let env_log = dir.join("mysqldump.env");

        let script = format!(
            "#!/bin/sh\n\
for arg in \"$@\"; do printf '%s\\n' \"$arg\"; done > '{args}'\n\
printf '%s' \"${{MYSQL_PWD:-}}\" > '{env}'\n\
cat <<'SQL'\n{dump}SQL\n\
exit {code}\n",
            args = args_log.display(),
            env = env_log.display(),
            dump = FAKE_DUMP,
            code = exit_code,
        );
        fs::write(&program, script).expect("Failed to write fake mysqldump");
        make_executable(&program);

        Self {
            program,
            args_log,
            env_log,
        }
    }

    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(&self.args_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn recorded_password(&self) -> String {
        fs::read_to_string(&self.env_log).unwrap_or_default()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Table source returning a fixed list
pub struct FixedTableSource(pub Vec<String>);

impl FixedTableSource {
    pub fn new(tables: &[&str]) -> Self {
        Self(tables.iter().map(|t| t.to_string()).collect())
    }
}

#[async_trait]
impl TableSource for FixedTableSource {
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>, SpawnError> {
        Ok(self
            .0
            .iter()
            .filter(|table| table.starts_with(prefix))
            .cloned()
            .collect())
    }
}
