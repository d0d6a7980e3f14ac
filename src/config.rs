//! Configuration management for sigil.
//!
//! The whole prompt is driven by one immutable [`PromptConfig`], loaded from
//! TOML at start-up and threaded explicitly through every render pass.
//!
//! ```toml
//! format = "$directory$git_branch$character"
//! command_timeout = 300
//!
//! [git_branch]
//! symbol = "🌱 "
//! style = "bold purple"
//!
//! [custom.deploy]
//! command = "cat .deploy-target"
//! detect_files = [".deploy-target"]
//! format = "[⛅ $output]($style) "
//! ```

pub mod validation;

pub use validation::ValidationReport;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{IntoSigilError, Result, SigilError};
use crate::format::compile;

/// Top-level format used when none is configured or the configured one is invalid.
pub const DEFAULT_FORMAT: &str = "$all";

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "SIGIL_CONFIG";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Top-level template.
    #[serde(default = "default_format")]
    pub format: String,

    /// Budget for the shared directory scan, in milliseconds.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout: u64,

    /// Default budget for a probe or external command, in milliseconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// Print an empty line before the prompt.
    #[serde(default = "default_true")]
    pub add_newline: bool,

    /// User-defined command modules, addressed as `custom.<name>`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, CustomModuleConfig>,

    /// Per-module tables keyed by module name.
    #[serde(flatten)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_scan_timeout() -> u64 {
    30
}

fn default_command_timeout() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            scan_timeout: default_scan_timeout(),
            command_timeout: default_command_timeout(),
            add_newline: true,
            custom: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }
}

/// Settings shared by every module table.
///
/// Module-specific keys (`truncation_length`, `min_time`, ...) land in
/// `options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_files: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_extensions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_folders: Option<Vec<String>>,

    /// Shell command whose success activates the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(flatten)]
    pub options: toml::Table,
}

/// A `[custom.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomModuleConfig {
    /// Command whose trimmed stdout becomes `$output`.
    pub command: String,

    /// Shell argv used to run `command` and `when`, e.g. `["bash", "-c"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub base: ModuleConfig,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    #[must_use]
    pub fn with_detect_files(mut self, files: &[&str]) -> Self {
        self.detect_files = Some(files.iter().map(|f| f.to_string()).collect());
        self
    }

    #[must_use]
    pub fn with_when(mut self, command: impl Into<String>) -> Self {
        self.when = Some(command.into());
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(toml::Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(toml::Value::as_bool)
    }

    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options
            .get(key)
            .and_then(toml::Value::as_integer)
            .and_then(|i| u64::try_from(i).ok())
    }
}

impl CustomModuleConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: ModuleConfig) -> Self {
        self.base = base;
        self
    }
}

impl PromptConfig {
    /// Where the config file is looked up: `$SIGIL_CONFIG`, else
    /// `<config dir>/sigil.toml`.
    pub fn config_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|dir| dir.join("sigil.toml")),
        }
    }

    /// Load the configuration from [`Self::config_path`].
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SigilError::config_with_path(format!("failed to read: {}", e), path.to_path_buf())
        })?;
        toml::from_str(&content).map_err(|e| {
            SigilError::config_with_path(format!("failed to parse: {}", e), path.to_path_buf())
        })
    }

    /// [`Self::load`], falling back to the defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            error!("{}; using default configuration", e);
            Self::default()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).into_sigil_config()
    }

    /// Settings for `name`; `custom.<name>` resolves to the custom table.
    pub fn module(&self, name: &str) -> ModuleConfig {
        match name.strip_prefix("custom.") {
            Some(custom) => self
                .custom
                .get(custom)
                .map(|c| c.base.clone())
                .unwrap_or_default(),
            None => self.modules.get(name).cloned().unwrap_or_default(),
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout)
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    #[must_use]
    pub fn with_add_newline(mut self, add_newline: bool) -> Self {
        self.add_newline = add_newline;
        self
    }

    #[must_use]
    pub fn with_scan_timeout(mut self, ms: u64) -> Self {
        self.scan_timeout = ms;
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, ms: u64) -> Self {
        self.command_timeout = ms;
        self
    }

    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, config: ModuleConfig) -> Self {
        self.modules.insert(name.into(), config);
        self
    }

    #[must_use]
    pub fn with_custom(mut self, name: impl Into<String>, config: CustomModuleConfig) -> Self {
        self.custom.insert(name.into(), config);
        self
    }

    /// Check the configuration against the known module names.
    pub fn validate(&self, known_modules: &[&str]) -> ValidationReport {
        let mut report = ValidationReport::new();

        if self.command_timeout == 0 {
            report.warn("command_timeout is 0; every probe will time out");
        }
        if self.scan_timeout == 0 {
            report.warn("scan_timeout is 0; file-based detection is disabled");
        }
        if let Err(e) = compile(&self.format) {
            report.error(SigilError::format("format", e));
        }

        for (name, module) in &self.modules {
            if !known_modules.contains(&name.as_str()) {
                report.warn(format!("unknown module table [{}]", name));
            }
            check_module(&mut report, name, module);
        }

        for (name, custom) in &self.custom {
            let field = format!("custom.{}", name);
            if custom.command.trim().is_empty() {
                report.error(SigilError::invalid_config(
                    format!("{}.command", field),
                    "must not be empty",
                ));
            }
            if matches!(&custom.shell, Some(shell) if shell.is_empty()) {
                report.error(SigilError::invalid_config(
                    format!("{}.shell", field),
                    "must name a program",
                ));
            }
            check_module(&mut report, &field, &custom.base);
        }

        report
    }
}

fn check_module(report: &mut ValidationReport, name: &str, module: &ModuleConfig) {
    if let Some(format) = &module.format {
        if let Err(e) = compile(format) {
            report.error(SigilError::format(format!("{}.format", name), e));
        }
    }
    if module.timeout_ms == Some(0) {
        report.warn(format!("{}.timeout_ms is 0; the module will always time out", name));
    }
}
