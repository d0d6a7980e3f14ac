use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// Binds nothing; its format is a bare newline.
pub struct LineBreakProbe;

#[async_trait]
impl Probe for LineBreakProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        Ok(ModuleResult::new())
    }
}
