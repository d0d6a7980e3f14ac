//! Module activation.
//!
//! The current directory is listed once per render into a [`DirListing`];
//! every module's [`Detection`] predicate is then evaluated against that
//! shared listing, so adding modules never adds filesystem work.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{ModuleConfig, PromptConfig};
use crate::context::Context;
use crate::error::{Result, SigilError};
use crate::exec::CommandRunner;
use crate::modules::ModuleDescriptor;

/// Names found directly inside one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    dir: PathBuf,
    files: HashSet<String>,
    extensions: HashSet<String>,
    folders: HashSet<String>,
}

impl DirListing {
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// List the immediate children of `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut listing = Self::empty(dir);

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SigilError::Detection {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().is_dir() {
                listing.folders.insert(name);
            } else {
                listing.add_file(name);
            }
        }

        Ok(listing)
    }

    /// Build a listing from names, without touching the filesystem.
    pub fn from_names(dir: impl Into<PathBuf>, files: &[&str], folders: &[&str]) -> Self {
        let mut listing = Self::empty(dir);
        for file in files {
            listing.add_file((*file).to_string());
        }
        listing.folders = folders.iter().map(|f| f.to_string()).collect();
        listing
    }

    fn add_file(&mut self, name: String) {
        self.extensions.extend(extensions_of(&name));
        self.files.insert(name);
    }

    /// Scan `dir` on the blocking pool, giving up after `timeout`.
    ///
    /// Never fails: an unreadable directory or a slow filesystem yields an
    /// empty listing.
    pub async fn scan(dir: &Path, timeout: Duration) -> Self {
        Self::scan_with(dir, timeout, Self::from_dir).await
    }

    async fn scan_with<F>(dir: &Path, timeout: Duration, list: F) -> Self
    where
        F: FnOnce(&Path) -> Result<Self> + Send + 'static,
    {
        let owned = dir.to_path_buf();
        let task = tokio::task::spawn_blocking(move || list(&owned));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(listing))) => {
                debug!(
                    "Scanned {}: {} files, {} folders",
                    dir.display(),
                    listing.files.len(),
                    listing.folders.len()
                );
                listing
            }
            Ok(Ok(Err(e))) => {
                warn!("{}", e);
                Self::empty(dir)
            }
            Ok(Err(e)) => {
                warn!("Directory scan of {} panicked: {}", dir.display(), e);
                Self::empty(dir)
            }
            Err(_) => {
                warn!(
                    "Directory scan of {} exceeded {}ms",
                    dir.display(),
                    timeout.as_millis()
                );
                Self::empty(dir)
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }

    pub fn has_folder(&self, name: &str) -> bool {
        self.folders.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }
}

/// Every dotted suffix of a file name: `a.tar.gz` gives `tar.gz` and `gz`.
/// A leading dot marks a hidden file, not an extension.
fn extensions_of(name: &str) -> impl Iterator<Item = String> + '_ {
    let stem = name.strip_prefix('.').unwrap_or(name);
    stem.match_indices('.')
        .map(move |(i, _)| stem[i + 1..].to_string())
        .filter(|ext| !ext.is_empty())
}

/// When a module is active.
///
/// Filename, extension and folder lists plus the `when` command are OR'ed.
/// A list entry written `!name` vetoes activation when it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub files: Vec<String>,
    pub extensions: Vec<String>,
    pub folders: Vec<String>,
    /// Shell command; exit status 0 activates the module.
    pub when: Option<String>,
    /// Shell argv the `when` command runs under.
    pub shell: Option<Vec<String>>,
    pub always: bool,
}

impl Detection {
    /// A predicate that never activates on its own.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn always() -> Self {
        Self {
            always: true,
            ..Self::default()
        }
    }

    pub fn files(files: &[&str]) -> Self {
        Self {
            files: to_strings(files),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = to_strings(extensions);
        self
    }

    #[must_use]
    pub fn with_folders(mut self, folders: &[&str]) -> Self {
        self.folders = to_strings(folders);
        self
    }

    #[must_use]
    pub fn with_when(mut self, command: impl Into<String>) -> Self {
        self.when = Some(command.into());
        self
    }

    #[must_use]
    pub fn with_shell(mut self, shell: Option<Vec<String>>) -> Self {
        self.shell = shell;
        self
    }

    /// Replace the lists and `when` command with any set in `config`.
    #[must_use]
    pub fn with_overrides(&self, config: &ModuleConfig) -> Self {
        let mut detection = self.clone();
        if let Some(files) = &config.detect_files {
            detection.files = files.clone();
            detection.always = false;
        }
        if let Some(extensions) = &config.detect_extensions {
            detection.extensions = extensions.clone();
            detection.always = false;
        }
        if let Some(folders) = &config.detect_folders {
            detection.folders = folders.clone();
            detection.always = false;
        }
        if let Some(when) = &config.when {
            detection.when = Some(when.clone());
            detection.always = false;
        }
        detection
    }

    /// Whether the filesystem part of the predicate matches.
    pub fn matches_listing(&self, listing: &DirListing) -> bool {
        fn hit(entries: &[String], present: impl Fn(&str) -> bool) -> bool {
            entries
                .iter()
                .any(|e| !e.starts_with('!') && present(e.as_str()))
        }

        hit(&self.files, |f| listing.has_file(f))
            || hit(&self.extensions, |e| listing.has_extension(e))
            || hit(&self.folders, |f| listing.has_folder(f))
    }

    /// Whether a `!name` entry matches the listing.
    pub fn vetoed(&self, listing: &DirListing) -> bool {
        fn hit(entries: &[String], present: impl Fn(&str) -> bool) -> bool {
            entries
                .iter()
                .filter_map(|e| e.strip_prefix('!'))
                .any(|name| present(name))
        }

        hit(&self.files, |f| listing.has_file(f))
            || hit(&self.extensions, |e| listing.has_extension(e))
            || hit(&self.folders, |f| listing.has_folder(f))
    }

    /// Decide activation; only the `when` command can suspend, and it gets
    /// at most `timeout`.
    pub async fn is_active(
        &self,
        listing: &DirListing,
        ctx: &Context,
        runner: &dyn CommandRunner,
        timeout: Duration,
    ) -> bool {
        if self.vetoed(listing) {
            return false;
        }
        if self.always || self.matches_listing(listing) {
            return true;
        }
        let Some(command) = &self.when else {
            return false;
        };

        let run = runner.run_shell(command, self.shell.as_deref(), &ctx.current_dir);
        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(output)) => output.success(),
            Ok(Err(e)) => {
                debug!("when-check '{}' failed: {}", command, e);
                false
            }
            Err(_) => {
                debug!(
                    "when-check '{}' exceeded {}ms",
                    command,
                    timeout.as_millis()
                );
                false
            }
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Select the active modules, preserving the order they were given in.
///
/// Disabled modules are skipped without evaluating their predicate; `when`
/// commands of the remaining modules run concurrently, each bounded by
/// `command_timeout`.
pub async fn detect<'a>(
    modules: &[&'a ModuleDescriptor],
    config: &PromptConfig,
    listing: &DirListing,
    ctx: &Context,
    runner: &dyn CommandRunner,
) -> Vec<&'a ModuleDescriptor> {
    let candidates: Vec<(&'a ModuleDescriptor, Detection)> = modules
        .iter()
        .filter_map(|descriptor| {
            let module_config = config.module(&descriptor.name);
            if descriptor.is_disabled(&module_config) {
                debug!("Module '{}' is disabled", descriptor.name);
                return None;
            }
            Some((*descriptor, descriptor.detection.with_overrides(&module_config)))
        })
        .collect();

    let timeout = config.command_timeout();
    let verdicts = join_all(
        candidates
            .iter()
            .map(|(_, detection)| detection.is_active(listing, ctx, runner, timeout)),
    )
    .await;

    candidates
        .into_iter()
        .zip(verdicts)
        .filter_map(|((descriptor, _), active)| active.then_some(descriptor))
        .collect()
}
