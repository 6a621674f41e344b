// File: wpsnapshots/src/services/config_editor.rs
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::constants::cache;
use crate::errors::ConfigRewriteError;

/// Final include that boots WordPress; always re-appended last.
pub const BOOTSTRAP_LINE: &str = "require_once( ABSPATH . 'wp-settings.php' );";

/// Value of a `define()` constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl ConfigValue {
    /// Parse a CLI-style value: `true`/`false` and integers become literals,
    /// everything else stays a string.
    pub fn parse_loose(raw: &str) -> Self {
        match raw {
            "true" => ConfigValue::Bool(true),
            "false" => ConfigValue::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(ConfigValue::Int)
                .unwrap_or_else(|_| ConfigValue::Str(raw.to_string())),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

/// Rewrite `template` into `destination`, replacing any existing definition
/// of the given constants and re-appending the bootstrap include.
///
/// `template` and `destination` may be the same file. Running this again with
/// the same constants produces identical output.
pub async fn rewrite_config(
    template: &Path,
    destination: &Path,
    constants: &[(String, ConfigValue)],
) -> Result<(), ConfigRewriteError> {
    info!(
        "Writing {} from {} ({} constants)",
        destination.display(),
        template.display(),
        constants.len()
    );

    let content = tokio::fs::read_to_string(template)
        .await
        .map_err(|source| ConfigRewriteError::ReadFailed {
            path: template.to_path_buf(),
            source,
        })?;

    let rewritten = rewrite_content(&content, constants)?;
    write_atomic(destination, rewritten).await?;

    info!("✓ Config written to {}", destination.display());
    Ok(())
}

pub fn rewrite_content(
    content: &str,
    constants: &[(String, ConfigValue)],
) -> Result<String, ConfigRewriteError> {
    for (name, value) in constants {
        if let ConfigValue::Str(text) = value {
            if text.contains(['\n', '\r']) {
                return Err(ConfigRewriteError::MultilineValue { name: name.clone() });
            }
        }
    }

    let bootstrap = bootstrap_pattern();
    let definitions = constants
        .iter()
        .map(|(name, _)| definition_pattern(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut output = String::with_capacity(content.len() + constants.len() * 48);
    for line in content.lines() {
        if bootstrap.is_match(line) {
            debug!("Dropping bootstrap include");
            continue;
        }
        if definitions.iter().any(|pattern| pattern.is_match(line)) {
            debug!("Dropping existing definition: {}", line.trim());
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }

    for (name, value) in constants {
        output.push_str(&format!("define( '{}', {} );\n", name, value));
    }
    output.push_str(BOOTSTRAP_LINE);
    output.push('\n');

    Ok(output)
}

fn bootstrap_pattern() -> Regex {
    Regex::new(r#"^\s*require_once\s*\(?\s*ABSPATH\s*\.\s*['"]wp-settings\.php['"]\s*\)?\s*;"#)
        .expect("static bootstrap pattern")
}

fn definition_pattern(name: &str) -> Result<Regex, ConfigRewriteError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigRewriteError::InvalidConstant {
            name: name.to_string(),
        });
    }
    let pattern = format!(r#"define\s*\(\s*['"]{}['"]\s*,"#, regex::escape(name));
    Regex::new(&pattern).map_err(|_| ConfigRewriteError::InvalidConstant {
        name: name.to_string(),
    })
}

async fn write_atomic(destination: &Path, body: String) -> Result<(), ConfigRewriteError> {
    let mut partial = destination.as_os_str().to_owned();
    partial.push(cache::PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    let write_failed = |source| ConfigRewriteError::WriteFailed {
        path: destination.to_path_buf(),
        source,
    };

    // The config holds credentials; keep whatever mode it already has.
    let existing = tokio::fs::metadata(destination)
        .await
        .ok()
        .map(|meta| meta.permissions());

    let written = async {
        tokio::fs::write(&partial, body).await?;
        if let Some(permissions) = existing {
            tokio::fs::set_permissions(&partial, permissions).await?;
        }
        tokio::fs::rename(&partial, destination).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(write_failed(e));
    }
    Ok(())
}
