//! Immutable snapshot of everything a render pass may look at.
//!
//! A [`Context`] is built once per prompt from CLI flags and the process
//! environment, then shared read-only between all probes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Environment variables copied into the snapshot by [`ContextBuilder::capture_env`].
pub const RELEVANT_ENV: &[&str] = &[
    "USER",
    "USERNAME",
    "LOGNAME",
    "HOME",
    "SSH_CONNECTION",
    "SSH_CLIENT",
    "SSH_TTY",
    "VIRTUAL_ENV",
    "CONDA_DEFAULT_ENV",
    "AWS_PROFILE",
    "AWS_VAULT",
    "AWS_DEFAULT_PROFILE",
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
];

/// How the previous command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Code(i32),
    Signal(i32),
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::Code(0)
    }
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

/// The shell the prompt is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Nu,
    #[default]
    Unknown,
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::PowerShell => "powershell",
            Self::Nu => "nu",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for Shell {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "fish" => Self::Fish,
            "powershell" | "pwsh" => Self::PowerShell,
            "nu" | "nushell" => Self::Nu,
            _ => Self::Unknown,
        })
    }
}

/// Per-render snapshot. Nothing mutates it once built.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub exit_status: ExitStatus,
    pub cmd_duration: Option<Duration>,
    /// Physical working directory, symlinks resolved.
    pub current_dir: PathBuf,
    /// Directory as the shell reports it (`$PWD`).
    pub logical_dir: PathBuf,
    pub shell: Shell,
    pub env: HashMap<String, String>,
    pub jobs: u32,
    pub home_dir: Option<PathBuf>,
}

impl Context {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// First of `keys` that is set to a non-empty value.
    pub fn first_env(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.env(key))
    }

    pub fn is_ssh(&self) -> bool {
        self.first_env(&["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"])
            .is_some()
    }
}

/// Builder for [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    context: Context,
}

impl ContextBuilder {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            context: Context {
                current_dir: dir.clone(),
                logical_dir: dir,
                home_dir: dirs::home_dir(),
                ..Context::default()
            },
        }
    }

    #[must_use]
    pub fn with_exit_status(mut self, status: ExitStatus) -> Self {
        self.context.exit_status = status;
        self
    }

    #[must_use]
    pub fn with_cmd_duration(mut self, duration: Duration) -> Self {
        self.context.cmd_duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: u32) -> Self {
        self.context.jobs = jobs;
        self
    }

    #[must_use]
    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.context.shell = shell;
        self
    }

    /// Move the snapshot to `dir`, physical and logical.
    #[must_use]
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.context.logical_dir = dir.clone();
        self.context.current_dir = dir;
        self
    }

    #[must_use]
    pub fn with_logical_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.context.logical_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_home_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.context.home_dir = dir;
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.env.insert(key.into(), value.into());
        self
    }

    /// Copy the variables in [`RELEVANT_ENV`] from the process environment.
    #[must_use]
    pub fn capture_env(mut self) -> Self {
        for key in RELEVANT_ENV {
            if let Ok(value) = std::env::var(key) {
                self.context.env.entry((*key).to_string()).or_insert(value);
            }
        }
        self
    }

    pub fn build(mut self) -> Context {
        if let Ok(physical) = self.context.current_dir.canonicalize() {
            self.context.current_dir = physical;
        }
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert!(ExitStatus::default().success());
        assert!(!ExitStatus::Code(1).success());
        assert!(!ExitStatus::Signal(9).success());
    }

    #[test]
    fn test_shell_from_str() {
        assert_eq!("BASH".parse::<Shell>().unwrap(), Shell::Bash);
        assert_eq!("pwsh".parse::<Shell>().unwrap(), Shell::PowerShell);
        assert_eq!("tcsh".parse::<Shell>().unwrap(), Shell::Unknown);
        assert_eq!(Shell::Zsh.to_string(), "zsh");
    }

    #[test]
    fn test_builder() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::new(dir.path())
            .with_exit_status(ExitStatus::Code(2))
            .with_jobs(3)
            .with_shell(Shell::Fish)
            .with_logical_dir("/logical")
            .with_env("AWS_PROFILE", "dev")
            .with_env("EMPTY", "")
            .build();

        assert_eq!(ctx.exit_status, ExitStatus::Code(2));
        assert_eq!(ctx.jobs, 3);
        assert_eq!(ctx.shell, Shell::Fish);
        assert_eq!(ctx.logical_dir, PathBuf::from("/logical"));
        assert_eq!(ctx.current_dir, dir.path().canonicalize().unwrap());
        assert_eq!(ctx.env("AWS_PROFILE"), Some("dev"));
        assert_eq!(ctx.env("EMPTY"), None);
        assert_eq!(ctx.first_env(&["MISSING", "AWS_PROFILE"]), Some("dev"));
    }

    #[test]
    fn test_is_ssh() {
        let ctx = ContextBuilder::new("/")
            .with_env("SSH_TTY", "/dev/pts/0")
            .build();
        assert!(ctx.is_ssh());
        assert!(!ContextBuilder::new("/").build().is_ssh());
    }
}
