// File: wpsnapshots/src/services/process.rs
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::constants::timeouts;
use crate::errors::SpawnError;
use crate::services::commands::{CommandSpec, Platform};

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub code: i32,
    pub stdout: String,
}

/// Spawns external tools from a [`CommandSpec`] without a shell.
///
/// A command's secret is set on the child's own environment only, so the
/// parent environment is never touched and concurrent runs do not race.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    platform: Platform,
    deadline: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(timeouts::COMMAND)
    }
}

impl ProcessRunner {
    pub fn new(deadline: Duration) -> Self {
        Self {
            platform: Platform::current(),
            deadline,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Run with inherited stdio and return the exit code.
    ///
    /// A non-zero exit is an error when `exit_on_error` is set, otherwise the
    /// code is handed back for the caller to inspect. Failing to start the
    /// process is always an error.
    pub async fn run(&self, spec: &CommandSpec, exit_on_error: bool) -> Result<i32, SpawnError> {
        let mut command = self.command(spec);
        command.stdin(Stdio::inherit()).stderr(Stdio::inherit());

        match &spec.stdout {
            Some(path) => {
                let file = std::fs::File::create(path).map_err(|source| SpawnError::Redirect {
                    path: path.clone(),
                    source,
                })?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::inherit());
            }
        }

        info!("Executing: {}", spec.display(self.platform));

        let mut child = command.spawn().map_err(|source| SpawnError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let status = match timeout(self.deadline, child.wait()).await {
            Ok(result) => result.map_err(|source| SpawnError::Spawn {
                program: spec.program.clone(),
                source,
            })?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(SpawnError::TimedOut {
                    program: spec.program.clone(),
                    after: self.deadline,
                });
            }
        };

        let code = status.code().unwrap_or(-1);
        self.check_status(spec, code, status.success(), exit_on_error)
    }

    /// Run with stdout captured, for short queries whose output is parsed.
    pub async fn capture(
        &self,
        spec: &CommandSpec,
        exit_on_error: bool,
    ) -> Result<CapturedOutput, SpawnError> {
        let mut command = self.command(spec);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!("Capturing: {}", spec.display(self.platform));

        let child = command.spawn().map_err(|source| SpawnError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        // dropping the future on timeout kills the child (kill_on_drop)
        let output = match timeout(self.deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| SpawnError::Spawn {
                program: spec.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(SpawnError::TimedOut {
                    program: spec.program.clone(),
                    after: self.deadline,
                })
            }
        };

        let code = output.status.code().unwrap_or(-1);
        let code = self.check_status(spec, code, output.status.success(), exit_on_error)?;
        Ok(CapturedOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }

    fn command(&self, spec: &CommandSpec) -> AsyncCommand {
        let (program, args) = spec.argv(self.platform);
        let mut command = AsyncCommand::new(program);
        command.args(args).kill_on_drop(true);
        if let Some(secret) = &spec.secret {
            command.env(&secret.name, secret.value());
        }
        command
    }

    fn check_status(
        &self,
        spec: &CommandSpec,
        code: i32,
        success: bool,
        exit_on_error: bool,
    ) -> Result<i32, SpawnError> {
        if success {
            debug!("{} completed with exit code {}", spec.program, code);
            return Ok(code);
        }
        if exit_on_error {
            return Err(SpawnError::Failed {
                program: spec.program.clone(),
                code,
            });
        }
        warn!("{} exited with status {} (continuing)", spec.program, code);
        Ok(code)
    }
}
