//! External command execution.
//!
//! Every process a probe starts goes through a [`CommandRunner`], which keeps
//! probes testable and puts one timeout policy in a single place.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, trace};

use crate::error::{Result, SigilError};

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd`.
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput>;

    /// Run `command` through `shell` (`sh -c` when unset).
    async fn run_shell(
        &self,
        command: &str,
        shell: Option<&[String]>,
        cwd: &Path,
    ) -> Result<CommandOutput> {
        let (program, mut args) = match shell {
            Some([program, rest @ ..]) => (program.clone(), rest.to_vec()),
            _ => default_shell(),
        };
        args.push(command.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&program, &args, cwd).await
    }

    /// Run `program` and return its stdout, treating a non-zero exit as failure.
    async fn output(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String> {
        let output = self.run(program, args, cwd).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(SigilError::command_failed(
                command_line(program, args),
                format!(
                    "exited with code {}: {}",
                    output.exit_code.unwrap_or(-1),
                    output.stderr.trim()
                ),
            ))
        }
    }
}

fn default_shell() -> (String, Vec<String>) {
    if cfg!(windows) {
        ("cmd".to_string(), vec!["/C".to_string()])
    } else {
        ("sh".to_string(), vec!["-c".to_string()])
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs commands with `tokio::process`, killing them when the timeout fires.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        let resolved = which::which(program).map_err(|_| SigilError::MissingTool {
            tool: program.to_string(),
        })?;
        let line = command_line(program, args);
        trace!("Running '{}' in {}", line, cwd.display());

        let child = AsyncCommand::new(resolved)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SigilError::command_failed(&line, e.to_string()))?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(SigilError::command_failed(&line, e.to_string())),
            Err(_) => {
                debug!("'{}' timed out after {}ms", line, self.timeout.as_millis());
                return Err(SigilError::CommandTimeout {
                    command: line,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
