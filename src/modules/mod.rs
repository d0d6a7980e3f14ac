//! Prompt modules.
//!
//! A module is a [`Probe`] that binds variables from the [`Context`], plus a
//! declarative [`Detection`] predicate and a default format. Built-ins live
//! in the submodules and are collected by [`ModuleRegistry::builtin`].

mod aws;
mod character;
mod cmd_duration;
mod custom;
mod directory;
mod git;
mod jobs;
mod languages;
mod line_break;
mod registry;
mod result;
mod status;
mod time;
mod username;

pub use registry::ModuleRegistry;
pub use result::ModuleResult;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ModuleConfig;
use crate::context::Context;
use crate::detect::{Detection, DirListing};
use crate::exec::CommandRunner;

/// Everything a probe may look at. Shared, never mutated.
#[derive(Clone)]
pub struct ProbeContext {
    pub module: String,
    pub context: Arc<Context>,
    pub listing: Arc<DirListing>,
    pub runner: Arc<dyn CommandRunner>,
    pub config: Arc<ModuleConfig>,
}

impl ProbeContext {
    pub fn cwd(&self) -> &Path {
        &self.context.current_dir
    }

    /// The configured `symbol`, or `default`.
    pub fn symbol(&self, default: &str) -> String {
        self.config
            .symbol
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    /// A string option from the module table, or `default`.
    pub fn option_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.config.option_str(key).unwrap_or(default)
    }
}

/// Computes a module's variables.
///
/// Probes run concurrently and never see each other's output. Returning an
/// error, panicking or running past the timeout all make the module absent.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult>;
}

/// Static description of a module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub description: String,
    pub detection: Detection,
    pub default_format: String,
    pub default_style: String,
    pub timeout: Option<Duration>,
    pub disabled_by_default: bool,
    pub probe: Arc<dyn Probe>,
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("detection", &self.detection)
            .field("default_format", &self.default_format)
            .field("timeout", &self.timeout)
            .field("disabled_by_default", &self.disabled_by_default)
            .finish_non_exhaustive()
    }
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            detection: Detection::always(),
            default_format: String::new(),
            default_style: String::new(),
            timeout: None,
            disabled_by_default: false,
            probe,
        }
    }

    #[must_use]
    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detection = detection;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.default_style = style.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn disabled_by_default(mut self) -> Self {
        self.disabled_by_default = true;
        self
    }

    pub fn is_disabled(&self, config: &ModuleConfig) -> bool {
        config.disabled.unwrap_or(self.disabled_by_default)
    }

    pub fn format<'a>(&'a self, config: &'a ModuleConfig) -> &'a str {
        config.format.as_deref().unwrap_or(&self.default_format)
    }

    pub fn style<'a>(&'a self, config: &'a ModuleConfig) -> &'a str {
        config.style.as_deref().unwrap_or(&self.default_style)
    }
}

/// Extract the first `x.y[.z]` version number in `output`.
pub(crate) fn parse_version(output: &str) -> Option<String> {
    use regex::Regex;
    use std::sync::OnceLock;

    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").ok())
        .as_ref()
        .and_then(|re| re.captures(output))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticProbe;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("rustc 1.80.1 (3f5fd8dd4 2024-08-06)").as_deref(), Some("1.80.1"));
        assert_eq!(parse_version("v20.11.0\n").as_deref(), Some("20.11.0"));
        assert_eq!(parse_version("go version go1.22 linux/amd64").as_deref(), Some("1.22"));
        assert_eq!(parse_version("no digits"), None);
    }

    #[test]
    fn test_descriptor_config_overrides() {
        let descriptor = ModuleDescriptor::new("m", "test", Arc::new(StaticProbe::new()))
            .with_format("[$x]($style)")
            .with_style("bold")
            .disabled_by_default();

        let empty = ModuleConfig::default();
        assert_eq!(descriptor.format(&empty), "[$x]($style)");
        assert_eq!(descriptor.style(&empty), "bold");
        assert!(descriptor.is_disabled(&empty));

        let custom = ModuleConfig::new()
            .with_format("$x")
            .with_style("red")
            .with_disabled(false);
        assert_eq!(descriptor.format(&custom), "$x");
        assert_eq!(descriptor.style(&custom), "red");
        assert!(!descriptor.is_disabled(&custom));
    }
}
