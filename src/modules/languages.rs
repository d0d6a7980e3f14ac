//! Toolchain version modules.

use std::path::Path;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;

use super::{parse_version, ModuleResult, Probe, ProbeContext};
use crate::exec::CommandRunner;

type VersionCommands = &'static [(&'static str, &'static [&'static str])];

const RUSTC: VersionCommands = &[("rustc", &["--version"])];
const NODE: VersionCommands = &[("node", &["--version"])];
const GO: VersionCommands = &[("go", &["version"])];
const PYTHON: VersionCommands = &[("python3", &["--version"]), ("python", &["--version"])];

/// Binds `version` from the first version number a command prints.
pub struct VersionProbe {
    /// Commands tried in order until one succeeds.
    commands: VersionCommands,
}

impl VersionProbe {
    pub fn new(commands: VersionCommands) -> Self {
        Self { commands }
    }

    pub fn rust() -> Self {
        Self::new(RUSTC)
    }

    pub fn nodejs() -> Self {
        Self::new(NODE)
    }

    pub fn golang() -> Self {
        Self::new(GO)
    }

    pub fn python() -> Self {
        Self::new(PYTHON)
    }

    async fn version(&self, runner: &dyn CommandRunner, cwd: &Path) -> anyhow::Result<String> {
        let mut last_error = None;

        for (program, args) in self.commands {
            match runner.run(program, args, cwd).await {
                // Older interpreters print their version on stderr.
                Ok(output) if output.success() => {
                    let text = if output.stdout.trim().is_empty() {
                        &output.stderr
                    } else {
                        &output.stdout
                    };
                    return parse_version(text)
                        .map(|v| format!("v{}", v))
                        .with_context(|| format!("no version in '{} {}' output", program, args.join(" ")));
                }
                Ok(output) => {
                    last_error = Some(anyhow!(
                        "'{}' exited with {:?}",
                        program,
                        output.exit_code
                    ))
                }
                Err(e) => last_error = Some(e.into()),
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("no version command configured")))
    }
}

#[async_trait]
impl Probe for VersionProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let version = self.version(ctx.runner.as_ref(), ctx.cwd()).await?;
        Ok(ModuleResult::new()
            .with("version", version)
            .with("symbol", ctx.symbol("")))
    }
}

/// Python version plus the active virtualenv name.
pub struct PythonProbe {
    inner: VersionProbe,
}

impl PythonProbe {
    pub fn new() -> Self {
        Self {
            inner: VersionProbe::python(),
        }
    }
}

#[async_trait]
impl Probe for PythonProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let version = self.inner.version(ctx.runner.as_ref(), ctx.cwd()).await?;
        let virtualenv = ctx
            .context
            .env("VIRTUAL_ENV")
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .or_else(|| ctx.context.env("CONDA_DEFAULT_ENV").map(str::to_string));

        Ok(ModuleResult::new()
            .with("version", version)
            .with("symbol", ctx.symbol("🐍 "))
            .with_opt("virtualenv", virtualenv))
    }
}
