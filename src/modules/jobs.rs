use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// Background job count; absent when there are none.
pub struct JobsProbe;

#[async_trait]
impl Probe for JobsProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let jobs = ctx.context.jobs;
        if jobs == 0 {
            return Ok(ModuleResult::absent());
        }

        // The count is only worth showing once there is more than one job.
        let threshold = ctx.config.option_u64("number_threshold").unwrap_or(2);
        let number = (u64::from(jobs) >= threshold).then(|| jobs.to_string());

        Ok(ModuleResult::new()
            .with("symbol", ctx.symbol("✦"))
            .with_opt("number", number))
    }
}
