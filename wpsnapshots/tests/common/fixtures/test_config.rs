//! Builder for test configurations

use std::path::Path;
use std::sync::Arc;

use wpsnapshots::config::Config;

pub struct TestConfigBuilder {
    config: Config,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_cache_dir(mut self, dir: &Path) -> Self {
        self.config.cache_dir = Some(dir.to_string_lossy().to_string());
        self
    }

    pub fn with_mysqldump(mut self, program: &Path) -> Self {
        self.config.tools.mysqldump = program.to_string_lossy().to_string();
        self
    }

    pub fn with_author(mut self, name: &str, email: &str) -> Self {
        self.config.author_name = Some(name.to_string());
        self.config.author_email = Some(email.to_string());
        self
    }

    pub fn with_command_timeout(mut self, seconds: u64) -> Self {
        self.config.command_timeout_seconds = seconds;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn build_arc(self) -> Arc<Config> {
        Arc::new(self.config)
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
