// File: wpsnapshots/src/services/commands.rs
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::export;
use crate::errors::ValidationError;

/// Value of a single `--key` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Rendered as a bare `--key`
    Flag,
    /// Rendered as `--key=value`
    Value(String),
    /// Rendered as one `--key=value` token per element
    List(Vec<String>),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Value(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Environment entry handed only to the spawned child.
#[derive(Clone)]
pub struct SecretEnv {
    pub name: String,
    value: String,
}

impl SecretEnv {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SecretEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretEnv({}=<redacted>)", self.name)
    }
}

/// Structured invocation of an external tool. Values are stored unescaped;
/// escaping happens only when rendering for a shell.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<(String, ArgValue)>,
    pub trailing: Vec<String>,
    pub secret: Option<SecretEnv>,
    pub stdout: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            trailing: Vec::new(),
            secret: None,
            stdout: None,
        }
    }

    pub fn flag(self, key: &str) -> Self {
        self.arg(key, ArgValue::Flag)
    }

    pub fn value(self, key: &str, value: impl Into<String>) -> Self {
        self.arg(key, ArgValue::Value(value.into()))
    }

    pub fn arg(mut self, key: &str, value: ArgValue) -> Self {
        self.args.push((key.to_string(), value));
        self
    }

    pub fn args(mut self, pairs: impl IntoIterator<Item = (String, ArgValue)>) -> Self {
        self.args.extend(pairs);
        self
    }

    pub fn trailing(mut self, arg: impl Into<String>) -> Self {
        self.trailing.push(arg.into());
        self
    }

    pub fn secret(mut self, name: &str, value: &str) -> Self {
        self.secret = Some(SecretEnv::new(name, value));
        self
    }

    pub fn redirect_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Option and trailing tokens exactly as the child receives them.
    pub fn rendered_args(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .args
            .iter()
            .flat_map(|(key, value)| render_arg(key, value))
            .collect();
        tokens.extend(self.trailing.iter().cloned());
        tokens
    }

    /// Program and argument vector to spawn on `platform`.
    pub fn argv(&self, platform: Platform) -> (String, Vec<String>) {
        let mut parts = Vec::with_capacity(self.args.len() + self.trailing.len() + 2);
        parts.push(self.program.clone());
        parts.extend(self.rendered_args());

        match platform {
            Platform::Unix if parts[0] != export::ENV_PREFIX => {
                parts.insert(0, export::ENV_PREFIX.to_string());
            }
            Platform::Windows if parts[0] == export::ENV_PREFIX && parts.len() > 1 => {
                parts.remove(0);
            }
            _ => {}
        }

        let program = parts.remove(0);
        (program, parts)
    }

    /// Shell-escaped form for logs and diagnostics. Secrets never appear.
    pub fn display(&self, platform: Platform) -> String {
        let mut parts = vec![shell_escape(&self.program).into_owned()];
        for (key, value) in &self.args {
            parts.extend(render_shell_arg(key, value));
        }
        parts.extend(self.trailing.iter().map(|arg| shell_escape(arg).into_owned()));
        if let Some(path) = &self.stdout {
            parts.push(">".to_string());
            parts.push(shell_escape(&path.to_string_lossy()).into_owned());
        }
        apply_platform_prefix(&parts.join(" "), platform)
    }
}

/// Render one option as raw argv tokens.
pub fn render_arg(key: &str, value: &ArgValue) -> Vec<String> {
    match value {
        ArgValue::Flag => vec![format!("--{}", key)],
        ArgValue::Value(v) => vec![format!("--{}={}", key, v)],
        ArgValue::List(values) => values.iter().map(|v| format!("--{}={}", key, v)).collect(),
    }
}

/// Render one option with every value escaped for a POSIX shell.
pub fn render_shell_arg(key: &str, value: &ArgValue) -> Vec<String> {
    match value {
        ArgValue::Flag => vec![format!("--{}", key)],
        ArgValue::Value(v) => vec![format!("--{}={}", key, shell_escape(v))],
        ArgValue::List(values) => values
            .iter()
            .map(|v| format!("--{}={}", key, shell_escape(v)))
            .collect(),
    }
}

pub fn shell_escape(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Ensure a command string goes through `/usr/bin/env` on Unix and strip
/// that prefix on Windows.
pub fn apply_platform_prefix(command: &str, platform: Platform) -> String {
    let prefix = format!("{} ", export::ENV_PREFIX);
    match platform {
        Platform::Unix => {
            if command.starts_with(&prefix) {
                command.to_string()
            } else {
                format!("{}{}", prefix, command)
            }
        }
        Platform::Windows => command
            .strip_prefix(&prefix)
            .map(|rest| rest.trim_start().to_string())
            .unwrap_or_else(|| command.to_string()),
    }
}

// === DATABASE CONNECTION ARGUMENTS ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEndpoint {
    Port(u16),
    Socket(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub host: String,
    pub endpoint: Option<HostEndpoint>,
}

impl HostSpec {
    /// Split a raw `host[:port-or-socket]` string. Only a single `:` is
    /// treated as a separator; anything else is taken as the host name.
    ///
    /// An all-digit right side is always a TCP port and must fit in `u16`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.matches(':').count() != 1 {
            return Ok(Self {
                host: raw.to_string(),
                endpoint: None,
            });
        }

        let (host, rest) = raw.split_once(':').unwrap_or((raw, ""));
        let endpoint = if rest.is_empty() {
            None
        } else if rest.chars().all(|c| c.is_ascii_digit()) {
            let port = rest
                .parse::<u16>()
                .map_err(|_| ValidationError::InvalidPort {
                    host: raw.to_string(),
                })?;
            Some(HostEndpoint::Port(port))
        } else {
            Some(HostEndpoint::Socket(rest.to_string()))
        };

        Ok(Self {
            host: host.to_string(),
            endpoint,
        })
    }

    pub fn to_args(&self) -> Vec<(String, ArgValue)> {
        let mut args = vec![("host".to_string(), ArgValue::Value(self.host.clone()))];
        match &self.endpoint {
            Some(HostEndpoint::Port(port)) => {
                args.push(("port".to_string(), ArgValue::Value(port.to_string())));
                args.push(("protocol".to_string(), ArgValue::Value("tcp".to_string())));
            }
            Some(HostEndpoint::Socket(socket)) => {
                args.push(("socket".to_string(), ArgValue::Value(socket.clone())));
            }
            None => {}
        }
        args
    }
}

pub fn mysql_host_to_args(raw: &str) -> Result<Vec<(String, ArgValue)>, ValidationError> {
    Ok(HostSpec::parse(raw)?.to_args())
}

#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Build a mysql-client invocation. The password travels in the child's
/// environment, never as an argument.
pub fn build_export_command(
    program: &str,
    host: &HostSpec,
    credentials: &Credentials,
    extra_args: Vec<(String, ArgValue)>,
    trailing: Vec<String>,
    output_redirect: Option<&Path>,
) -> CommandSpec {
    let mut spec = CommandSpec::new(program)
        .args(host.to_args())
        .value("user", credentials.user.clone())
        .args(extra_args);

    if !credentials.password.is_empty() {
        spec = spec.secret(export::PASSWORD_ENV_VAR, &credentials.password);
    }
    for arg in trailing {
        spec = spec.trailing(arg);
    }
    if let Some(path) = output_redirect {
        spec = spec.redirect_stdout(path);
    }
    spec
}

/// Build a `tar` invocation archiving `source` into a gzip file.
pub fn build_archive_command<'a>(
    program: &str,
    source: &Path,
    output: &Path,
    excludes: impl IntoIterator<Item = &'a String>,
) -> CommandSpec {
    let excludes: Vec<String> = excludes
        .into_iter()
        .map(|path| format!("./{}", path.trim().trim_start_matches("./").trim_matches('/')))
        .collect();

    let mut spec = CommandSpec::new(program)
        .flag("create")
        .flag("gzip")
        .value("file", output.to_string_lossy().to_string())
        .value("directory", source.to_string_lossy().to_string());
    if !excludes.is_empty() {
        spec = spec.arg("exclude", ArgValue::List(excludes));
    }
    spec.trailing(".")
}
