use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};
use crate::error::SigilError;

/// A `[custom.<name>]` module: the trimmed stdout of a shell command.
pub struct CustomProbe {
    command: String,
    shell: Option<Vec<String>>,
}

impl CustomProbe {
    pub fn new(command: impl Into<String>, shell: Option<Vec<String>>) -> Self {
        Self {
            command: command.into(),
            shell,
        }
    }
}

#[async_trait]
impl Probe for CustomProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let output = ctx
            .runner
            .run_shell(&self.command, self.shell.as_deref(), ctx.cwd())
            .await?;
        if !output.success() {
            return Err(SigilError::command_failed(
                &self.command,
                format!("exited with {:?}", output.exit_code),
            )
            .into());
        }

        let text = output.stdout.trim();
        let symbol = ctx.symbol("");
        Ok(ModuleResult::new()
            .with_opt("output", (!text.is_empty()).then_some(text))
            .with_opt("symbol", (!symbol.is_empty()).then_some(symbol)))
    }
}
