//! Test doubles for the command runner and for probes.
//!
//! These mocks provide controllable, deterministic stand-ins so that module
//! and scheduler tests never spawn real processes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use crate::config::ModuleConfig;
use crate::context::ContextBuilder;
use crate::detect::DirListing;
use crate::error::{Result, SigilError};
use crate::exec::{command_line, CommandOutput, CommandRunner};
use crate::modules::{ModuleResult, Probe, ProbeContext};

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    Fail(String),
    Hang,
}

/// Mock implementation of [`CommandRunner`].
///
/// Responses are keyed by the full command line (`"git status --porcelain"`)
/// for [`CommandRunner::run`], and by the raw command for
/// [`CommandRunner::run_shell`]. Unknown commands behave like a missing
/// binary.
///
/// # Example
///
/// ```rust,ignore
/// let runner = MockCommandRunner::new()
///     .with_output("rustc --version", "rustc 1.80.1\n")
///     .with_exit_code("test -f missing", 1);
/// ```
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    responses: HashMap<String, Response>,
    call_count: AtomicU32,
}

impl Clone for MockCommandRunner {
    fn clone(&self) -> Self {
        Self {
            responses: self.responses.clone(),
            call_count: AtomicU32::new(self.call_count.load(Ordering::SeqCst)),
        }
    }
}

impl MockCommandRunner {
    /// Create a runner that knows no commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout`.
    #[must_use]
    pub fn with_output(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            Response::Output(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
        );
        self
    }

    /// Succeed with output on stderr only.
    #[must_use]
    pub fn with_stderr(mut self, command: &str, stderr: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            Response::Output(CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: Some(0),
            }),
        );
        self
    }

    /// Exit with `code` and no output.
    #[must_use]
    pub fn with_exit_code(mut self, command: &str, code: i32) -> Self {
        self.responses.insert(
            command.to_string(),
            Response::Output(CommandOutput {
                exit_code: Some(code),
                ..CommandOutput::default()
            }),
        );
        self
    }

    /// Fail to run at all with `message`.
    #[must_use]
    pub fn with_failure(mut self, command: &str, message: &str) -> Self {
        self.responses
            .insert(command.to_string(), Response::Fail(message.to_string()));
        self
    }

    /// Never return.
    #[must_use]
    pub fn with_hang(mut self, command: &str) -> Self {
        self.responses.insert(command.to_string(), Response::Hang);
        self
    }

    /// Number of commands run so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    async fn respond(&self, key: &str, program: &str) -> Result<CommandOutput> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(key) {
            Some(Response::Output(output)) => Ok(output.clone()),
            Some(Response::Fail(message)) => Err(SigilError::command_failed(key, message.clone())),
            Some(Response::Hang) => {
                std::future::pending::<()>().await;
                Err(SigilError::command_failed(key, "unreachable"))
            }
            None => Err(SigilError::MissingTool {
                tool: program.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> Result<CommandOutput> {
        self.respond(&command_line(program, args), program).await
    }

    async fn run_shell(
        &self,
        command: &str,
        _shell: Option<&[String]>,
        _cwd: &Path,
    ) -> Result<CommandOutput> {
        self.respond(command, "sh").await
    }
}

#[derive(Debug, Clone, Default)]
enum Behaviour {
    #[default]
    Succeed,
    Fail(String),
    Hang,
}

/// A probe that returns fixed variables, optionally after a delay.
///
/// # Example
///
/// ```rust,ignore
/// let probe = StaticProbe::new()
///     .with_var("version", "v1.0.0")
///     .with_delay(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    vars: Vec<(String, Option<String>)>,
    styles: Vec<(String, String)>,
    delay: Option<Duration>,
    behaviour: Behaviour,
}

impl StaticProbe {
    /// A probe that succeeds with no variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe whose every call fails with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            behaviour: Behaviour::Fail(message.to_string()),
            ..Self::default()
        }
    }

    /// A probe that never completes.
    #[must_use]
    pub fn hanging() -> Self {
        Self {
            behaviour: Behaviour::Hang,
            ..Self::default()
        }
    }

    /// Bind `name` to `value`.
    #[must_use]
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.push((name.to_string(), Some(value.to_string())));
        self
    }

    /// Bind `name` as absent.
    #[must_use]
    pub fn with_absent(mut self, name: &str) -> Self {
        self.vars.push((name.to_string(), None));
        self
    }

    /// Bind a style variable.
    #[must_use]
    pub fn with_style(mut self, name: &str, style: &str) -> Self {
        self.styles.push((name.to_string(), style.to_string()));
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behaviour {
            Behaviour::Succeed => {}
            Behaviour::Fail(message) => bail!("{}", message),
            Behaviour::Hang => std::future::pending::<()>().await,
        }

        let mut result = ModuleResult::new();
        for (name, value) in &self.vars {
            result.set(name, value.clone());
        }
        for (name, style) in &self.styles {
            result.set_style(name, style.as_str());
        }
        Ok(result)
    }
}

/// A [`ProbeContext`] in the system temp directory with an empty listing and
/// a runner that knows no commands.
///
/// `configure` adjusts the context before it is built.
pub fn probe_context(
    configure: impl FnOnce(ContextBuilder) -> ContextBuilder,
    config: ModuleConfig,
) -> ProbeContext {
    probe_context_with(MockCommandRunner::new(), configure, config)
}

/// Like [`probe_context`] with a prepared runner.
pub fn probe_context_with(
    runner: impl CommandRunner + 'static,
    configure: impl FnOnce(ContextBuilder) -> ContextBuilder,
    config: ModuleConfig,
) -> ProbeContext {
    let context = configure(ContextBuilder::new(std::env::temp_dir())).build();
    let listing = DirListing::empty(context.current_dir.clone());
    ProbeContext {
        module: "test".to_string(),
        context: Arc::new(context),
        listing: Arc::new(listing),
        runner: Arc::new(runner),
        config: Arc::new(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_responses() {
        let runner = MockCommandRunner::new()
            .with_output("node --version", "v20.0.0\n")
            .with_exit_code("false", 1)
            .with_failure("broken", "no such file");
        let cwd = std::env::temp_dir();

        let output = runner.run("node", &["--version"], &cwd).await.unwrap();
        assert_eq!(output.stdout, "v20.0.0\n");
        assert!(output.success());

        let output = runner.run_shell("false", None, &cwd).await.unwrap();
        assert!(!output.success());

        assert!(runner.run_shell("broken", None, &cwd).await.is_err());
        assert!(matches!(
            runner.run("go", &["version"], &cwd).await,
            Err(SigilError::MissingTool { .. })
        ));
        assert_eq!(runner.call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_runner_output_rejects_nonzero() {
        let runner = MockCommandRunner::new().with_exit_code("git status", 128);
        let result = runner.output("git", &["status"], &std::env::temp_dir()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_runner_hang_is_cancellable() {
        let runner = MockCommandRunner::new().with_hang("sleep");
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            runner.run_shell("sleep", None, &std::env::temp_dir()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_static_probe() {
        let ctx = probe_context(|b| b, ModuleConfig::new());
        let result = StaticProbe::new()
            .with_var("a", "1")
            .with_absent("b")
            .with_style("s", "red")
            .probe(&ctx)
            .await
            .unwrap();
        assert_eq!(result.value("a"), Some("1"));
        assert_eq!(result.get("b"), Some(None));
        assert_eq!(result.style("s"), Some("red"));

        assert!(StaticProbe::failing("nope").probe(&ctx).await.is_err());
    }
}
