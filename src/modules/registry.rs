use std::sync::Arc;

use tracing::debug;

use super::aws::AwsProbe;
use super::character::CharacterProbe;
use super::cmd_duration::CmdDurationProbe;
use super::custom::CustomProbe;
use super::directory::DirectoryProbe;
use super::git::{GitBranchProbe, GitCommitProbe, GitStateProbe, GitStatusProbe};
use super::jobs::JobsProbe;
use super::languages::{PythonProbe, VersionProbe};
use super::line_break::LineBreakProbe;
use super::status::StatusProbe;
use super::time::TimeProbe;
use super::username::UsernameProbe;
use super::ModuleDescriptor;
use crate::config::PromptConfig;
use crate::detect::Detection;

const LANGUAGE_FORMAT: &str = "via [$symbol$version]($style) ";

/// Ordered collection of module descriptors.
///
/// The order is the order `$all` renders in.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in modules in their default order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_head().into_iter().chain(builtin_tail()) {
            registry.register(descriptor);
        }
        registry
    }

    /// Built-ins plus the `[custom.<name>]` modules of `config`, which are
    /// placed before the trailing status modules.
    pub fn from_config(config: &PromptConfig) -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_head() {
            registry.register(descriptor);
        }
        for (name, custom) in &config.custom {
            debug!("Registering custom module '{}'", name);
            let probe = CustomProbe::new(custom.command.clone(), custom.shell.clone());
            let description = custom
                .description
                .clone()
                .unwrap_or_else(|| format!("Output of `{}`", custom.command));
            registry.register(
                ModuleDescriptor::new(format!("custom.{}", name), description, Arc::new(probe))
                    .with_detection(Detection::always().with_shell(custom.shell.clone()))
                    .with_format("[$symbol($output )]($style)")
                    .with_style("bold green"),
            );
        }
        for descriptor in builtin_tail() {
            registry.register(descriptor);
        }
        registry
    }

    /// Add a module, replacing any module of the same name in place.
    pub fn register(&mut self, descriptor: ModuleDescriptor) {
        match self.modules.iter_mut().find(|m| m.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.modules.push(descriptor),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn builtin_head() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new("username", "The active user, shown for root or over SSH", Arc::new(UsernameProbe))
            .with_format("[$user]($style) in ")
            .with_style("bold yellow"),
        ModuleDescriptor::new("directory", "The current working directory", Arc::new(DirectoryProbe))
            .with_format("[$path]($style)[$read_only]($read_only_style) ")
            .with_style("bold cyan"),
        ModuleDescriptor::new("git_branch", "The active branch of the repo", Arc::new(GitBranchProbe))
            .with_format("on [$symbol$branch(:$remote)]($style) ")
            .with_style("bold purple"),
        ModuleDescriptor::new("git_commit", "The active commit hash and tag", Arc::new(GitCommitProbe))
            .with_format("[\\($hash$tag\\)]($style) ")
            .with_style("bold green"),
        ModuleDescriptor::new("git_state", "In-progress merge, rebase or bisect", Arc::new(GitStateProbe))
            .with_format("\\([$state( $progress_current/$progress_total)]($style)\\) ")
            .with_style("bold yellow"),
        ModuleDescriptor::new("git_status", "Symbols for the working tree state", Arc::new(GitStatusProbe))
            .with_format("([\\[$all_status$ahead_behind\\]]($style) )")
            .with_style("bold red"),
        ModuleDescriptor::new("rust", "The installed rustc version", Arc::new(VersionProbe::rust()))
            .with_detection(Detection::files(&["Cargo.toml"]).with_extensions(&["rs"]))
            .with_format(LANGUAGE_FORMAT)
            .with_style("bold red"),
        ModuleDescriptor::new("nodejs", "The installed Node.js version", Arc::new(VersionProbe::nodejs()))
            .with_detection(
                Detection::files(&["package.json", ".nvmrc"])
                    .with_extensions(&["js", "mjs", "cjs", "ts"])
                    .with_folders(&["node_modules"]),
            )
            .with_format(LANGUAGE_FORMAT)
            .with_style("bold green"),
        ModuleDescriptor::new("python", "The Python version and active virtualenv", Arc::new(PythonProbe::new()))
            .with_detection(
                Detection::files(&["pyproject.toml", "requirements.txt", "setup.py"])
                    .with_extensions(&["py"]),
            )
            .with_format("via [$symbol$version( \\($virtualenv\\))]($style) ")
            .with_style("yellow bold"),
        ModuleDescriptor::new("golang", "The installed Go version", Arc::new(VersionProbe::golang()))
            .with_detection(Detection::files(&["go.mod"]).with_extensions(&["go"]))
            .with_format(LANGUAGE_FORMAT)
            .with_style("bold cyan"),
        ModuleDescriptor::new("aws", "The active AWS profile and region", Arc::new(AwsProbe))
            .with_format("on [$symbol$profile(@$region)]($style) ")
            .with_style("bold yellow"),
    ]
}

fn builtin_tail() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new("cmd_duration", "How long the last command took", Arc::new(CmdDurationProbe))
            .with_format("took [$duration]($style) ")
            .with_style("bold yellow"),
        ModuleDescriptor::new("jobs", "The number of background jobs", Arc::new(JobsProbe))
            .with_format("[$symbol$number]($style) ")
            .with_style("bold blue"),
        ModuleDescriptor::new("time", "The current local time", Arc::new(TimeProbe))
            .with_format("at [$time]($style) ")
            .with_style("bold yellow")
            .disabled_by_default(),
        ModuleDescriptor::new("status", "The exit code of the last command", Arc::new(StatusProbe))
            .with_format("[$symbol$status]($style) ")
            .with_style("bold red")
            .disabled_by_default(),
        ModuleDescriptor::new("line_break", "Starts a new line", Arc::new(LineBreakProbe))
            .with_format("\n"),
        ModuleDescriptor::new("character", "A prompt symbol coloured by the last exit status", Arc::new(CharacterProbe))
            .with_format("[$symbol]($style) "),
    ]
}
