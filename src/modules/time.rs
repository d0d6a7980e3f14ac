use std::fmt::Write;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Local, Utc};

use super::{ModuleResult, Probe, ProbeContext};

/// Wall clock time, formatted with `time_format` (strftime syntax).
pub struct TimeProbe;

#[async_trait]
impl Probe for TimeProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let format = ctx.option_str("time_format", "%T");
        let mut time = String::new();
        // An invalid strftime item surfaces as a formatting error.
        let written = if ctx.config.option_bool("utc").unwrap_or(false) {
            write!(time, "{}", Utc::now().format(format))
        } else {
            write!(time, "{}", Local::now().format(format))
        };
        written.map_err(|_| anyhow!("invalid time_format '{}'", format))?;

        Ok(ModuleResult::new().with("time", time))
    }
}
