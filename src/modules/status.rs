use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};
use crate::context::ExitStatus;

/// Exit status of the previous command; absent on success.
pub struct StatusProbe;

#[async_trait]
impl Probe for StatusProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let (status, signal) = match ctx.context.exit_status {
            ExitStatus::Code(0) => return Ok(ModuleResult::absent()),
            ExitStatus::Code(code) => (code, None),
            // Shells report a signalled command as 128 + signal.
            ExitStatus::Signal(signal) => (128i32.saturating_add(signal), Some(signal)),
        };

        Ok(ModuleResult::new()
            .with("status", status.to_string())
            .with_opt("signal", signal.map(|s| s.to_string()))
            .with("symbol", ctx.symbol("✖")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::testing::{assert_all_absent, assert_var, probe_context};

    #[tokio::test]
    async fn test_success_is_absent() {
        let ctx = probe_context(|b| b, ModuleConfig::new());
        assert_all_absent(&StatusProbe.probe(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_and_signal() {
        let ctx = probe_context(|b| b.with_exit_status(ExitStatus::Code(127)), ModuleConfig::new());
        let result = StatusProbe.probe(&ctx).await.unwrap();
        assert_eq!(result.value("status"), Some("127"));
        assert_eq!(result.get("signal"), Some(None));

        let ctx = probe_context(|b| b.with_exit_status(ExitStatus::Signal(9)), ModuleConfig::new());
        let result = StatusProbe.probe(&ctx).await.unwrap();
        assert_eq!(result.value("status"), Some("137"));
        assert_eq!(result.value("signal"), Some("9"));
    }

    #[tokio::test]
    async fn test_out_of_range_signal_saturates() {
        let ctx = probe_context(
            |b| b.with_exit_status(ExitStatus::Signal(i32::MAX)),
            ModuleConfig::new(),
        );
        let result = StatusProbe.probe(&ctx).await.unwrap();
        assert_var(&result, "status", &i32::MAX.to_string());
        assert_var(&result, "signal", &i32::MAX.to_string());
    }
}
