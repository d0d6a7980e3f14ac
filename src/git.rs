//! Git repository inspection.
//!
//! Branch, commit and in-progress operation are read straight from the
//! repository's files; only working tree status needs the `git` binary.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

/// A discovered repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Top of the working tree.
    pub workdir: PathBuf,
    /// The `.git` directory (or the directory a `.git` file points to).
    pub git_dir: PathBuf,
}

/// An operation that is stopped half way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Merging,
    Reverting,
    CherryPicking,
    Bisecting,
    /// `git am` in progress.
    ApplyMailbox,
    /// `rebase-apply` without a marker saying which of the two it is.
    ApplyMailboxOrRebase,
    Rebasing,
}

impl RepoState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Merging => "MERGING",
            Self::Reverting => "REVERTING",
            Self::CherryPicking => "CHERRY-PICKING",
            Self::Bisecting => "BISECTING",
            Self::ApplyMailbox => "AM",
            Self::ApplyMailboxOrRebase => "AM/REBASE",
            Self::Rebasing => "REBASING",
        }
    }

    /// Config key that overrides [`Self::label`].
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Merging => "merge",
            Self::Reverting => "revert",
            Self::CherryPicking => "cherry_pick",
            Self::Bisecting => "bisect",
            Self::ApplyMailbox => "am",
            Self::ApplyMailboxOrRebase => "am_or_rebase",
            Self::Rebasing => "rebase",
        }
    }
}

/// State plus `current/total` progress where git records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateProgress {
    pub state: RepoState,
    pub progress: Option<(usize, usize)>,
}

impl Repository {
    /// Find the repository containing `start`, walking up to the root.
    pub fn discover(start: &Path) -> Option<Self> {
        for dir in start.ancestors() {
            let dot_git = dir.join(".git");
            if dot_git.is_dir() {
                trace!("Git repository found at {}", dir.display());
                return Some(Self {
                    workdir: dir.to_path_buf(),
                    git_dir: dot_git,
                });
            }
            // Worktrees and submodules use a `gitdir: <path>` file.
            if dot_git.is_file() {
                let content = fs::read_to_string(&dot_git).ok()?;
                let target = content.trim().strip_prefix("gitdir:")?.trim();
                return Some(Self {
                    workdir: dir.to_path_buf(),
                    git_dir: dir.join(target),
                });
            }
        }
        None
    }

    fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.git_dir.join(relative)).ok()
    }

    fn has(&self, relative: &str) -> bool {
        self.git_dir.join(relative).exists()
    }

    fn read_number(&self, relative: &str) -> Option<usize> {
        self.read(relative)?.trim().parse().ok()
    }

    /// Raw contents of `HEAD`, trimmed.
    pub fn head(&self) -> Option<String> {
        self.read("HEAD").map(|head| head.trim().to_string())
    }

    pub fn is_detached(&self) -> bool {
        self.head().is_some_and(|head| !head.starts_with("ref:"))
    }

    /// Current branch name, `HEAD` when detached.
    pub fn branch(&self) -> Option<String> {
        let head = self.head()?;
        match head.strip_prefix("ref:") {
            Some(reference) => {
                let reference = reference.trim();
                let name = reference
                    .strip_prefix("refs/heads/")
                    .or_else(|| reference.rsplit('/').next())
                    .unwrap_or(reference);
                Some(name.to_string())
            }
            None => Some("HEAD".to_string()),
        }
    }

    /// Full hash of the commit `HEAD` points at.
    pub fn head_commit(&self) -> Option<String> {
        let head = self.head()?;
        if !head.starts_with("ref:") {
            return Some(head);
        }
        let reference = head["ref:".len()..].trim();

        if let Some(hash) = self.read(reference) {
            return Some(hash.trim().to_string());
        }

        // Packed refs: `<hash> <refname>` lines.
        self.read("packed-refs")?.lines().find_map(|line| {
            let (hash, name) = line.split_once(' ')?;
            (name.trim() == reference).then(|| hash.to_string())
        })
    }

    /// `<remote>/<branch>` tracked by `branch`, from `.git/config`.
    pub fn upstream(&self, branch: &str) -> Option<String> {
        let config = self.read("config")?;
        let header = format!("[branch \"{}\"]", branch);

        let mut in_section = false;
        let mut remote = None;
        let mut merge = None;
        for line in config.lines().map(str::trim) {
            if line.starts_with('[') {
                in_section = line == header;
                continue;
            }
            if !in_section {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "remote" => remote = Some(value.trim().to_string()),
                    "merge" => merge = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        let merge = merge?;
        let merge = merge.strip_prefix("refs/heads/").unwrap_or(&merge);
        Some(format!("{}/{}", remote?, merge))
    }

    /// The operation in progress, if any.
    pub fn state(&self) -> Option<StateProgress> {
        if self.has("rebase-merge") {
            let progress = self
                .read_number("rebase-merge/msgnum")
                .zip(self.read_number("rebase-merge/end"));
            return Some(StateProgress {
                state: RepoState::Rebasing,
                progress,
            });
        }

        if self.has("rebase-apply") {
            let state = if self.has("rebase-apply/rebasing") {
                RepoState::Rebasing
            } else if self.has("rebase-apply/applying") {
                RepoState::ApplyMailbox
            } else {
                RepoState::ApplyMailboxOrRebase
            };
            let progress = self
                .read_number("rebase-apply/next")
                .zip(self.read_number("rebase-apply/last"));
            return Some(StateProgress { state, progress });
        }

        let state = [
            ("MERGE_HEAD", RepoState::Merging),
            ("REVERT_HEAD", RepoState::Reverting),
            ("CHERRY_PICK_HEAD", RepoState::CherryPicking),
            ("BISECT_LOG", RepoState::Bisecting),
        ]
        .into_iter()
        .find_map(|(marker, state)| self.has(marker).then_some(state))?;

        Some(StateProgress {
            state,
            progress: None,
        })
    }

    /// Entries in the stash reflog.
    pub fn stash_count(&self) -> usize {
        self.read("logs/refs/stash")
            .map(|log| log.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0)
    }
}

/// Counts parsed from `git status --porcelain --branch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub conflicted: usize,
    pub staged: usize,
    pub added: usize,
    pub modified: usize,
    pub renamed: usize,
    pub deleted: usize,
    pub untracked: usize,
    pub ahead: usize,
    pub behind: usize,
}

/// Unmerged pairs as listed in git-status(1). Other equal pairs such as `MM`
/// are ordinary staged-and-modified entries.
const CONFLICT_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

impl StatusCounts {
    /// Count one entry per line.
    ///
    /// Unmerged pairs count as conflicted and nothing else. Otherwise an
    /// index code other than ` `, `?` or `!` counts as staged; `R` and `D`
    /// in either column count as renamed and deleted, `A` and `C` as added,
    /// and `M`, `T` or `U` in the worktree column as modified.
    pub fn parse(porcelain: &str) -> Self {
        let mut counts = Self::default();

        for line in porcelain.lines() {
            if let Some(header) = line.strip_prefix("## ") {
                counts.parse_branch_header(header);
                continue;
            }

            let Some(codes) = line.get(..2) else {
                continue;
            };
            if CONFLICT_CODES.contains(&codes) {
                counts.conflicted += 1;
                continue;
            }
            if codes == "??" {
                counts.untracked += 1;
                continue;
            }

            let mut chars = codes.chars();
            let index = chars.next().unwrap_or(' ');
            let worktree = chars.next().unwrap_or(' ');

            if !matches!(index, ' ' | '?' | '!') {
                counts.staged += 1;
            }
            if index == 'R' || worktree == 'R' {
                counts.renamed += 1;
            }
            if index == 'D' || worktree == 'D' {
                counts.deleted += 1;
            }
            if matches!(index, 'A' | 'C') || matches!(worktree, 'A' | 'C') {
                counts.added += 1;
            }
            if matches!(worktree, 'M' | 'T' | 'U') {
                counts.modified += 1;
            }
        }

        counts
    }

    // `main...origin/main [ahead 1, behind 2]`
    fn parse_branch_header(&mut self, header: &str) {
        let Some(start) = header.rfind('[') else {
            return;
        };
        let tracking = header[start + 1..].trim_end_matches(']');
        for part in tracking.split(',').map(str::trim) {
            if let Some(n) = part.strip_prefix("ahead ") {
                self.ahead = n.parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix("behind ") {
                self.behind = n.parse().unwrap_or(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixture;

    #[test]
    fn test_discover_walks_up() {
        let fixture = TestFixture::with_fake_git_repo("main");
        let nested = fixture.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.workdir, fixture.path());
        assert_eq!(repo.branch().as_deref(), Some("main"));
        assert!(!repo.is_detached());
    }

    #[test]
    fn test_discover_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let inside_repo = dir.path().ancestors().any(|a| a.join(".git").exists());
        assert_eq!(Repository::discover(dir.path()).is_some(), inside_repo);
    }

    #[test]
    fn test_gitdir_file() {
        let fixture = TestFixture::with_fake_git_repo("main");
        let worktree = fixture.path().join("wt");
        fs::create_dir_all(&worktree).unwrap();
        fs::write(worktree.join(".git"), "gitdir: ../.git\n").unwrap();

        let repo = Repository::discover(&worktree).unwrap();
        assert_eq!(repo.workdir, worktree);
        assert_eq!(repo.branch().as_deref(), Some("main"));
    }

    #[test]
    fn test_detached_head_and_commit() {
        let fixture = TestFixture::with_fake_git_repo("main");
        fixture.write_file(".git/refs/heads/main", "0123456789abcdef\n").unwrap();

        let repo = Repository::discover(fixture.path()).unwrap();
        assert_eq!(repo.head_commit().as_deref(), Some("0123456789abcdef"));

        fixture.write_file(".git/HEAD", "fedcba9876543210\n").unwrap();
        assert!(repo.is_detached());
        assert_eq!(repo.branch().as_deref(), Some("HEAD"));
        assert_eq!(repo.head_commit().as_deref(), Some("fedcba9876543210"));
    }

    #[test]
    fn test_packed_refs() {
        let fixture = TestFixture::with_fake_git_repo("release");
        fixture
            .write_file(".git/packed-refs", "# pack-refs with: peeled\naaaa111 refs/heads/release\n")
            .unwrap();
        let repo = Repository::discover(fixture.path()).unwrap();
        assert_eq!(repo.head_commit().as_deref(), Some("aaaa111"));
    }

    #[test]
    fn test_upstream() {
        let fixture = TestFixture::with_fake_git_repo("main");
        fixture
            .write_file(
                ".git/config",
                "[core]\n\tbare = false\n[branch \"main\"]\n\tremote = origin\n\tmerge = refs/heads/main\n",
            )
            .unwrap();
        let repo = Repository::discover(fixture.path()).unwrap();
        assert_eq!(repo.upstream("main").as_deref(), Some("origin/main"));
        assert_eq!(repo.upstream("other"), None);
    }

    #[test]
    fn test_state_markers() {
        let fixture = TestFixture::with_fake_git_repo("main");
        let repo = Repository::discover(fixture.path()).unwrap();
        assert_eq!(repo.state(), None);

        fixture.write_file(".git/MERGE_HEAD", "abc").unwrap();
        assert_eq!(repo.state().map(|s| s.state), Some(RepoState::Merging));

        fixture.write_file(".git/rebase-merge/msgnum", "2\n").unwrap();
        fixture.write_file(".git/rebase-merge/end", "5\n").unwrap();
        assert_eq!(
            repo.state(),
            Some(StateProgress {
                state: RepoState::Rebasing,
                progress: Some((2, 5)),
            })
        );
    }

    #[test]
    fn test_rebase_apply_variants() {
        let fixture = TestFixture::with_fake_git_repo("main");
        let repo = Repository::discover(fixture.path()).unwrap();

        fixture.write_file(".git/rebase-apply/next", "1").unwrap();
        fixture.write_file(".git/rebase-apply/last", "3").unwrap();
        assert_eq!(
            repo.state().map(|s| (s.state, s.progress)),
            Some((RepoState::ApplyMailboxOrRebase, Some((1, 3))))
        );

        fixture.write_file(".git/rebase-apply/applying", "").unwrap();
        assert_eq!(repo.state().map(|s| s.state), Some(RepoState::ApplyMailbox));
    }

    #[test]
    fn test_stash_count() {
        let fixture = TestFixture::with_fake_git_repo("main");
        let repo = Repository::discover(fixture.path()).unwrap();
        assert_eq!(repo.stash_count(), 0);

        fixture
            .write_file(".git/logs/refs/stash", "a b stash@{0}\nc d stash@{1}\n")
            .unwrap();
        assert_eq!(repo.stash_count(), 2);
    }

    #[test]
    fn test_parse_porcelain() {
        let counts = StatusCounts::parse(
            "## main...origin/main [ahead 2, behind 1]\n\
             M  staged.rs\n\
             \x20M modified.rs\n\
             MM both.rs\n\
             R  old.rs -> new.rs\n\
             \x20D gone.rs\n\
             UU conflict.rs\n\
             AA added-twice.rs\n\
             ?? new.txt\n",
        );

        assert_eq!(
            counts,
            StatusCounts {
                conflicted: 2,
                staged: 3,
                added: 0,
                modified: 2,
                renamed: 1,
                deleted: 1,
                untracked: 1,
                ahead: 2,
                behind: 1,
            }
        );
    }

    #[test]
    fn test_parse_equal_pairs_and_worktree_codes() {
        let counts = StatusCounts::parse(
            "MM both.rs\n\
             \x20C copied.rs\n\
             \x20U unmerged-side.rs\n\
             A  new.rs\n\
             !! target/\n",
        );

        assert_eq!(
            counts,
            StatusCounts {
                conflicted: 0,
                staged: 2,
                added: 2,
                modified: 2,
                ..StatusCounts::default()
            }
        );
    }

    #[test]
    fn test_parse_empty_porcelain() {
        assert_eq!(StatusCounts::parse(""), StatusCounts::default());
        assert_eq!(StatusCounts::parse("## main\n"), StatusCounts::default());
    }
}
