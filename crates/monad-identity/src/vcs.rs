//! Version control metadata
//!
//! [`VcsReader`] is the seam to the local repository. [`GitCli`] implements
//! it by running the `git` binary in the function directory.

use crate::error::{IdentityError, IdentityResult};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::process::Command;

/// Read-only snapshot of a working tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VcsSnapshot {
    /// Remote `origin` URL as configured
    pub origin_url: String,
    /// Current branch name
    pub branch: String,
    /// Full commit hash of `HEAD`
    pub commit: String,
    /// Working tree has uncommitted changes
    pub dirty: bool,
}

/// Reads version control metadata for a local path
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VcsReader: Send + Sync {
    /// Snapshot the repository containing `path`
    async fn open(&self, path: &Path) -> IdentityResult<VcsSnapshot>;
}

/// [`VcsReader`] backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Use `git` from `PATH`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable
    #[inline]
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> IdentityResult<String> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| IdentityError::vcs_read(dir, format!("cannot run git: {e}")))?;

        if !output.status.success() {
            return Err(IdentityError::vcs_read(
                dir,
                format!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VcsReader for GitCli {
    async fn open(&self, path: &Path) -> IdentityResult<VcsSnapshot> {
        tracing::debug!("Reading git metadata at {}", path.display());

        let origin_url = self.git(path, &["remote", "get-url", "origin"]).await?;
        let branch = self
            .git(path, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        let commit = self.git(path, &["rev-parse", "HEAD"]).await?;
        let status = self
            .git(path, &["status", "--porcelain", "--untracked-files=no"])
            .await?;

        Ok(VcsSnapshot {
            origin_url,
            branch,
            commit,
            dirty: has_modified_entries(&status),
        })
    }
}

/// Whether `git status --porcelain` output lists a modified tracked file
///
/// Only `M` in either status column counts; additions, deletions and
/// renames alone leave the tree clean.
#[must_use]
pub fn has_modified_entries(porcelain: &str) -> bool {
    porcelain
        .lines()
        .filter_map(|line| line.get(..2))
        .any(|xy| xy.contains('M'))
}

/// Final segment of the function directory, after making it absolute
///
/// `.` and `..` are resolved lexically, so `fn/.` and `fn/sub/..` both
/// name `fn`.
///
/// # Errors
/// Returns `IdentityError::InvalidFunctionPath` when nothing remains to
/// name (e.g. `/`), or the current directory is unavailable.
pub fn function_base_name(path: &Path) -> IdentityResult<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| IdentityError::InvalidFunctionPath(path.to_path_buf()))?
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    normalized
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IdentityError::InvalidFunctionPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    #[test]
    fn base_name_of_plain_directory() {
        assert_eq!(function_base_name(Path::new("/repo/functions/echo")).unwrap(), "echo");
        assert_eq!(function_base_name(Path::new("/repo/functions/echo/")).unwrap(), "echo");
    }

    #[test]
    fn base_name_resolves_dot_segments() {
        assert_eq!(function_base_name(Path::new("/repo/echo/.")).unwrap(), "echo");
        assert_eq!(function_base_name(Path::new("/repo/echo/src/..")).unwrap(), "echo");
    }

    #[test]
    fn base_name_of_relative_path() {
        assert_eq!(function_base_name(Path::new("e2e/echo")).unwrap(), "echo");
    }

    #[test]
    fn root_has_no_base_name() {
        let err = function_base_name(Path::new("/")).unwrap_err();
        assert!(matches!(err, IdentityError::InvalidFunctionPath(_)));
    }

    fn git_available() -> bool {
        StdCommand::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .args([
                "-c",
                "user.email=ci@example.com",
                "-c",
                "user.name=ci",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(dir: &Path) {
        run(dir, &["init", "-q"]);
        run(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run(
            dir,
            &["remote", "add", "origin", "git@github.com:acme/svc.git"],
        );
        std::fs::create_dir_all(dir.join("fn")).unwrap();
        std::fs::write(dir.join("fn/main.py"), "print('hi')\n").unwrap();
        run(dir, &["add", "."]);
        run(dir, &["commit", "-q", "-m", "init"]);
    }

    #[tokio::test]
    async fn git_cli_reads_clean_repository() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());

        let snapshot = GitCli::new().open(&tmp.path().join("fn")).await.unwrap();
        assert_eq!(snapshot.origin_url, "git@github.com:acme/svc.git");
        assert_eq!(snapshot.branch, "main");
        assert_eq!(snapshot.commit.len(), 40);
        assert!(!snapshot.dirty);
    }

    #[tokio::test]
    async fn git_cli_detects_modified_files() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());

        std::fs::write(tmp.path().join("untracked.txt"), "new\n").unwrap();
        let snapshot = GitCli::new().open(tmp.path()).await.unwrap();
        assert!(!snapshot.dirty);

        std::fs::write(tmp.path().join("fn/main.py"), "print('bye')\n").unwrap();
        let snapshot = GitCli::new().open(tmp.path()).await.unwrap();
        assert!(snapshot.dirty);
    }

    #[test]
    fn only_modified_entries_are_dirty() {
        assert!(!has_modified_entries(""));
        assert!(has_modified_entries(" M fn/main.py"));
        assert!(has_modified_entries("M  fn/main.py"));
        assert!(has_modified_entries("A  new.py\nMM fn/main.py"));
        assert!(!has_modified_entries("A  new.py"));
        assert!(!has_modified_entries("D  fn/main.py\n D other.py"));
        assert!(!has_modified_entries("R  old.py -> new.py"));
    }

    #[tokio::test]
    async fn git_cli_ignores_staged_deletions() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());

        run(tmp.path(), &["rm", "-q", "fn/main.py"]);
        let snapshot = GitCli::new().open(tmp.path()).await.unwrap();
        assert!(!snapshot.dirty);
    }

    #[tokio::test]
    async fn git_cli_outside_repository_fails() {
        if !git_available() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let err = GitCli::new().open(tmp.path()).await.unwrap_err();
        assert!(matches!(err, IdentityError::VcsRead { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_vcs_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = GitCli::with_program("/nonexistent/git")
            .open(tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::VcsRead { .. }));
    }
}
