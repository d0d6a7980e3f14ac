//! Test fixtures for creating reproducible directory layouts.
//!
//! Provides pre-built project and repository structures for detection, probe
//! and git tests.

use std::path::Path;
use tempfile::TempDir;

/// A temporary directory laid out for a test.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::with_files(&["Cargo.toml", "main.rs"]);
/// let listing = DirListing::from_dir(fixture.path()).unwrap();
/// // Directory is cleaned up when fixture goes out of scope
/// ```
pub struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a directory containing empty files with the given names.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn with_files(names: &[&str]) -> Self {
        let fixture = Self::empty();
        for name in names {
            fixture
                .write_file(name, "")
                .unwrap_or_else(|e| panic!("Failed to write {}: {}", name, e));
        }
        fixture
    }

    /// Create a `.git` directory by hand, with `HEAD` on `branch`.
    ///
    /// No `git` binary is needed; only the files the repository reader looks
    /// at are created.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn with_fake_git_repo(branch: &str) -> Self {
        let fixture = Self::empty();
        fixture
            .write_file(".git/HEAD", &format!("ref: refs/heads/{}\n", branch))
            .expect("Failed to write .git/HEAD");
        std::fs::create_dir_all(fixture.path().join(".git/refs/heads"))
            .expect("Failed to create .git/refs/heads");
        fixture
    }

    /// Get the path to the fixture directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, relative_path: &str, content: &str) -> std::io::Result<()> {
        let path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Read a file from the fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, relative_path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.temp_dir.path().join(relative_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_files() {
        let fixture = TestFixture::with_files(&["a.txt", "nested/b.rs"]);
        assert!(fixture.path().join("a.txt").is_file());
        assert!(fixture.path().join("nested/b.rs").is_file());
    }

    #[test]
    fn test_with_fake_git_repo() {
        let fixture = TestFixture::with_fake_git_repo("develop");
        assert_eq!(fixture.read_file(".git/HEAD").unwrap(), "ref: refs/heads/develop\n");
        assert!(fixture.path().join(".git/refs/heads").is_dir());
    }

    #[test]
    fn test_write_and_read_file() {
        let fixture = TestFixture::empty();
        fixture.write_file("deep/dir/file.txt", "hello").unwrap();
        assert_eq!(fixture.read_file("deep/dir/file.txt").unwrap(), "hello");
    }
}
