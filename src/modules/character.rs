use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// The prompt character, coloured by the previous command's outcome.
pub struct CharacterProbe;

#[async_trait]
impl Probe for CharacterProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let (symbol_key, style_key, default_style) = if ctx.context.exit_status.success() {
            ("success_symbol", "success_style", "bold green")
        } else {
            ("error_symbol", "error_style", "bold red")
        };

        let symbol = match ctx.config.option_str(symbol_key) {
            Some(symbol) => symbol.to_string(),
            None => ctx.symbol("❯"),
        };
        let style = ctx.option_str(style_key, default_style);

        Ok(ModuleResult::new()
            .with("symbol", symbol)
            .with_style("style", style))
    }
}
