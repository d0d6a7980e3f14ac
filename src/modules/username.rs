use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// The current user, shown over SSH, as root, or when `show_always` is set.
pub struct UsernameProbe;

#[async_trait]
impl Probe for UsernameProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let Some(user) = ctx.context.first_env(&["USER", "USERNAME", "LOGNAME"]) else {
            return Ok(ModuleResult::absent());
        };

        let is_root = user == "root";
        let show_always = ctx.config.option_bool("show_always").unwrap_or(false);
        if !(is_root || show_always || ctx.context.is_ssh()) {
            return Ok(ModuleResult::absent());
        }

        let style = if is_root {
            ctx.option_str("style_root", "bold red")
        } else {
            ctx.option_str("style_user", "bold yellow")
        };

        Ok(ModuleResult::new().with("user", user).with_style("style", style))
    }
}
