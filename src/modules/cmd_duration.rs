use std::time::Duration;

use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// Commands faster than this are not reported.
const DEFAULT_MIN_TIME_MS: u64 = 2_000;

/// How long the previous command took.
pub struct CmdDurationProbe;

#[async_trait]
impl Probe for CmdDurationProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let min_time = Duration::from_millis(
            ctx.config
                .option_u64("min_time")
                .unwrap_or(DEFAULT_MIN_TIME_MS),
        );

        match ctx.context.cmd_duration {
            Some(elapsed) if elapsed >= min_time => {
                Ok(ModuleResult::new().with("duration", humanize(elapsed)))
            }
            _ => Ok(ModuleResult::absent()),
        }
    }
}

/// `1h2m3s`, `4s`, `350ms`. Leading zero units are dropped, inner ones kept.
pub(crate) fn humanize(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        return format!("{}ms", millis);
    }

    let secs = duration.as_secs();
    let units = [
        (secs / 86_400, "d"),
        ((secs % 86_400) / 3_600, "h"),
        ((secs % 3_600) / 60, "m"),
        (secs % 60, "s"),
    ];

    units
        .iter()
        .skip_while(|(value, _)| *value == 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::testing::probe_context;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(Duration::from_millis(350)), "350ms");
        assert_eq!(humanize(Duration::from_secs(4)), "4s");
        assert_eq!(humanize(Duration::from_secs(60)), "1m0s");
        assert_eq!(humanize(Duration::from_secs(3_723)), "1h2m3s");
        assert_eq!(humanize(Duration::from_secs(90_061)), "1d1h1m1s");
    }

    #[tokio::test]
    async fn test_min_time() {
        let fast = probe_context(
            |b| b.with_cmd_duration(Duration::from_millis(1_500)),
            ModuleConfig::new(),
        );
        assert!(CmdDurationProbe.probe(&fast).await.unwrap().is_all_absent());

        let lowered = probe_context(
            |b| b.with_cmd_duration(Duration::from_millis(1_500)),
            ModuleConfig::new().with_option("min_time", 500),
        );
        let result = CmdDurationProbe.probe(&lowered).await.unwrap();
        assert_eq!(result.value("duration"), Some("1s"));
    }

    #[tokio::test]
    async fn test_unknown_duration_is_absent() {
        let ctx = probe_context(|b| b, ModuleConfig::new());
        assert!(CmdDurationProbe.probe(&ctx).await.unwrap().is_all_absent());
    }
}
