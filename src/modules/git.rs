//! Git modules: branch, commit, in-progress operation and working tree status.
//!
//! Reading the repository is plain file I/O, so it runs on the blocking pool.

use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};
use crate::git::{Repository, StatusCounts};

/// Discover the repository around the working directory and read from it
/// off the async workers. `None` outside a repository.
async fn read_repo<T, F>(ctx: &ProbeContext, read: F) -> anyhow::Result<Option<T>>
where
    F: FnOnce(Repository) -> Option<T> + Send + 'static,
    T: Send + 'static,
{
    let cwd = ctx.cwd().to_path_buf();
    Ok(tokio::task::spawn_blocking(move || Repository::discover(&cwd).and_then(read)).await?)
}

/// Current branch and its upstream.
pub struct GitBranchProbe;

#[async_trait]
impl Probe for GitBranchProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let head = read_repo(ctx, |repo| {
            let branch = repo.branch()?;
            let detached = repo.is_detached();
            let remote = if detached { None } else { repo.upstream(&branch) };
            Some((branch, detached, remote))
        })
        .await?;
        let Some((branch, detached, remote)) = head else {
            return Ok(ModuleResult::absent());
        };

        if detached && ctx.config.option_bool("only_attached").unwrap_or(false) {
            return Ok(ModuleResult::absent());
        }

        let display = match ctx.config.option_u64("truncation_length") {
            Some(length) if branch.chars().count() > length as usize => {
                let symbol = ctx.option_str("truncation_symbol", "…");
                let kept: String = branch.chars().take(length as usize).collect();
                format!("{}{}", kept, symbol)
            }
            _ => branch,
        };

        Ok(ModuleResult::new()
            .with("symbol", ctx.symbol("⎇ "))
            .with("branch", display)
            .with_opt("remote", remote))
    }
}

/// Abbreviated hash of `HEAD`, by default only when detached.
pub struct GitCommitProbe;

#[async_trait]
impl Probe for GitCommitProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let head = read_repo(ctx, |repo| {
            let detached = repo.is_detached();
            let commit = repo.head_commit();
            Some((repo, detached, commit))
        })
        .await?;
        let Some((repo, detached, commit)) = head else {
            return Ok(ModuleResult::absent());
        };
        let only_detached = ctx.config.option_bool("only_detached").unwrap_or(true);
        if only_detached && !detached {
            return Ok(ModuleResult::absent());
        }
        let Some(commit) = commit else {
            return Ok(ModuleResult::absent());
        };

        let length = ctx.config.option_u64("commit_hash_length").unwrap_or(7) as usize;
        let hash: String = commit.chars().take(length).collect();

        let tag = if ctx.config.option_bool("tag_disabled").unwrap_or(true) {
            None
        } else {
            ctx.runner
                .output("git", &["describe", "--tags", "--exact-match", "HEAD"], &repo.workdir)
                .await
                .ok()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .map(|tag| format!(" {}{}", ctx.option_str("tag_symbol", "🏷 "), tag))
        };

        Ok(ModuleResult::new().with("hash", hash).with_opt("tag", tag))
    }
}

/// Merge, rebase, bisect and friends, with rebase progress.
pub struct GitStateProbe;

#[async_trait]
impl Probe for GitStateProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let Some(state) = read_repo(ctx, |repo| repo.state()).await? else {
            return Ok(ModuleResult::absent());
        };

        let label = ctx.option_str(state.state.config_key(), state.state.label());
        let (current, total) = match state.progress {
            Some((current, total)) => (Some(current.to_string()), Some(total.to_string())),
            None => (None, None),
        };

        Ok(ModuleResult::new()
            .with("state", label)
            .with_opt("progress_current", current)
            .with_opt("progress_total", total))
    }
}

/// Working tree status from `git status --porcelain --branch`.
pub struct GitStatusProbe;

/// Display order of the `all_status` symbols, with their defaults.
const STATUS_SYMBOLS: [(&str, &str); 8] = [
    ("conflicted", "="),
    ("stashed", "$"),
    ("deleted", "✘"),
    ("renamed", "»"),
    ("modified", "!"),
    ("staged", "+"),
    ("added", "✚"),
    ("untracked", "?"),
];

#[async_trait]
impl Probe for GitStatusProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let found = read_repo(ctx, |repo| {
            let stashed = repo.stash_count();
            Some((repo, stashed))
        })
        .await?;
        let Some((repo, stashed)) = found else {
            return Ok(ModuleResult::absent());
        };

        let porcelain = ctx
            .runner
            .output("git", &["status", "--porcelain", "--branch"], &repo.workdir)
            .await?;
        let counts = StatusCounts::parse(&porcelain);
        let show_counts = ctx.config.option_bool("show_counts").unwrap_or(false);

        let mut result = ModuleResult::new();
        let mut all_status = String::new();
        for (name, default_symbol) in STATUS_SYMBOLS {
            let count = match name {
                "conflicted" => counts.conflicted,
                "stashed" => stashed,
                "deleted" => counts.deleted,
                "renamed" => counts.renamed,
                "modified" => counts.modified,
                "staged" => counts.staged,
                "added" => counts.added,
                _ => counts.untracked,
            };
            let value = (count > 0).then(|| {
                let symbol = ctx.option_str(name, default_symbol);
                if show_counts {
                    format!("{}{}", symbol, count)
                } else {
                    symbol.to_string()
                }
            });
            if let Some(value) = &value {
                all_status.push_str(value);
            }
            result.set(name, value);
        }

        result.set("all_status", (!all_status.is_empty()).then_some(all_status));
        result.set("ahead_behind", ahead_behind(ctx, &counts));
        Ok(result)
    }
}

fn ahead_behind(ctx: &ProbeContext, counts: &StatusCounts) -> Option<String> {
    let ahead = format!("{}{}", ctx.option_str("ahead", "⇡"), counts.ahead);
    let behind = format!("{}{}", ctx.option_str("behind", "⇣"), counts.behind);
    match (counts.ahead, counts.behind) {
        (0, 0) => None,
        (_, 0) => Some(ahead),
        (0, _) => Some(behind),
        _ => Some(format!("{}{}{}", ctx.option_str("diverged", "⇕"), ahead, behind)),
    }
}
