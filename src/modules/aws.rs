use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

const PROFILE_ENV: &[&str] = &["AWS_VAULT", "AWS_PROFILE", "AWS_DEFAULT_PROFILE"];
const REGION_ENV: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Active AWS profile and region from the environment.
pub struct AwsProbe;

#[async_trait]
impl Probe for AwsProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let profile = ctx.context.first_env(PROFILE_ENV);
        let region = ctx.context.first_env(REGION_ENV);
        if profile.is_none() && region.is_none() {
            return Ok(ModuleResult::absent());
        }

        let region = region.map(|r| {
            ctx.config
                .options
                .get("region_aliases")
                .and_then(|aliases| aliases.get(r))
                .and_then(toml::Value::as_str)
                .unwrap_or(r)
        });

        Ok(ModuleResult::new()
            .with("symbol", ctx.symbol("☁️ "))
            .with_opt("profile", profile)
            .with_opt("region", region))
    }
}
