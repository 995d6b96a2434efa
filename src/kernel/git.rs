//! Native git management using the `git2` crate.
//!
//! This module provides a wrapper around `libgit2` for companion
//! repository management, replacing external git command invocations.

use git2::{build::RepoBuilder, Repository};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::kernel::sources::CompanionSource;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Clone error: {0}")]
    Clone(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type for git operations
pub type GitResult<T> = Result<T, GitError>;

/// Manages companion repository operations using native git bindings
pub struct GitManager {
    repo_path: PathBuf,
}

impl GitManager {
    /// Creates a new GitManager for an existing repository
    pub fn new(repo_path: impl AsRef<Path>) -> GitResult<Self> {
        let repo_path = repo_path.as_ref().to_path_buf();

        // Verify the repository opens if the path exists
        if repo_path.exists() {
            Repository::open(&repo_path).map_err(|e| {
                GitError::Repository(format!(
                    "Failed to open repository at {:?}: {}",
                    repo_path, e
                ))
            })?;
        }

        Ok(GitManager { repo_path })
    }

    /// Clones a repository, or reuses an existing checkout at the target.
    ///
    /// Clone of an already-present repository is not an error: the
    /// existing checkout is opened, reported as reuse, and returned.
    /// This mirrors the idempotent-retry contract of the pipeline's
    /// companion acquisition.
    ///
    /// # Arguments
    /// * `url` - The repository URL (HTTP/HTTPS/SSH)
    /// * `branch` - Branch to check out; `None` uses the remote default
    /// * `target_path` - The local path for the checkout
    ///
    /// # Errors
    /// Returns `GitError::Clone` if a fresh clone fails
    pub fn clone_or_reuse(
        url: &str,
        branch: Option<&str>,
        target_path: impl AsRef<Path>,
    ) -> GitResult<Self> {
        let target_path = target_path.as_ref();

        if target_path.join(".git").exists() {
            log::info!(
                "[Git] [CLONE] Reusing existing checkout at {}",
                target_path.display()
            );
            return GitManager::new(target_path);
        }

        log::info!("[Git] [CLONE] Starting shallow clone (depth=1) for: {}", url);
        if let Some(branch) = branch {
            log::info!("[Git] [CLONE] Requested branch: {}", branch);
        }

        Self::shallow_clone(url, branch, target_path).or_else(|shallow_err| {
            log::warn!("[Git] [CLONE] Shallow clone failed: {}", shallow_err);
            log::info!("[Git] [CLONE] Falling back to standard (full) clone");

            let mut builder = RepoBuilder::new();
            if let Some(branch) = branch {
                builder.branch(branch);
            }
            builder.clone(url, target_path).map(|_| ()).map_err(|e| {
                GitError::Clone(format!(
                    "Failed to clone {} to {:?} (fallback): {}",
                    url, target_path, e
                ))
            })
        })?;

        log::info!("[Git] [CLONE] Clone completed successfully");
        GitManager::new(target_path)
    }

    /// Acquire one companion source into `target_path`, overriding the
    /// source's branch when `branch_override` is set.
    pub fn acquire(
        source: &CompanionSource,
        branch_override: Option<&str>,
        target_path: impl AsRef<Path>,
    ) -> GitResult<Self> {
        let branch = branch_override.or(source.branch);
        log::info!(
            "[Git] [ACQUIRE] {} <- {} (branch: {})",
            source.name,
            source.git_url,
            branch.unwrap_or("<default>")
        );
        Self::clone_or_reuse(source.git_url, branch, target_path)
    }

    /// Performs a shallow clone with depth=1 for bandwidth optimization
    fn shallow_clone(url: &str, branch: Option<&str>, target_path: &Path) -> GitResult<()> {
        let mut builder = RepoBuilder::new();
        if let Some(branch) = branch {
            builder.branch(branch);
        }

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.depth(1);

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.transfer_progress(|progress| {
            let received = progress.received_objects();
            let total = progress.total_objects();
            if total > 0 && received == total {
                log::debug!("[Git] [CLONE] [PROGRESS] {}/{} objects", received, total);
            }
            true
        });
        fetch_options.remote_callbacks(callbacks);
        builder.fetch_options(fetch_options);

        builder.clone(url, target_path).map_err(|e| {
            GitError::Clone(format!("Shallow clone failed for {}: {}", url, e))
        })?;

        Ok(())
    }

    /// Count the commits reachable from HEAD.
    ///
    /// This feeds the derived KernelSU version number. On a shallow
    /// checkout the count covers the fetched history only, matching the
    /// behavior of `git rev-list --count HEAD` in the same checkout.
    pub fn commit_count(&self) -> GitResult<u32> {
        let repo = Repository::open(&self.repo_path)
            .map_err(|e| GitError::Repository(format!("Failed to open repository: {}", e)))?;

        let mut revwalk = repo
            .revwalk()
            .map_err(|e| GitError::Repository(format!("Failed to start revwalk: {}", e)))?;
        revwalk
            .push_head()
            .map_err(|e| GitError::Repository(format!("Failed to push HEAD: {}", e)))?;

        let mut count: u32 = 0;
        for oid in revwalk {
            oid.map_err(|e| GitError::Repository(format!("Revwalk failed: {}", e)))?;
            count += 1;
        }

        Ok(count)
    }

    /// Gets the current HEAD commit hash
    pub fn get_head_commit(&self) -> GitResult<String> {
        let repo = Repository::open(&self.repo_path)
            .map_err(|e| GitError::Repository(format!("Failed to open repository: {}", e)))?;

        let head = repo
            .head()
            .map_err(|e| GitError::Repository(format!("Failed to read HEAD: {}", e)))?;

        let commit_id = head
            .target()
            .ok_or_else(|| GitError::Repository("HEAD is not a direct reference".to_string()))?;

        Ok(commit_id.to_string())
    }

    /// Returns the path to the repository
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_file(repo: &Repository, name: &str, message: &str) {
        let workdir = repo.workdir().expect("workdir");
        std::fs::write(workdir.join(name), message).expect("write file");

        let mut index = repo.index().expect("index");
        index
            .add_path(Path::new(name))
            .expect("add path");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = git2::Signature::now("Test User", "test@example.com").expect("signature");

        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .and_then(|oid| repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit");
    }

    #[test]
    fn test_git_manager_creation() {
        // Creating a manager for a non-existent path should succeed
        // (we only open the repository when the path already exists)
        let result = GitManager::new(PathBuf::from("/tmp/nonexistent_repo"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_clone_or_reuse_local_repo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source_path = temp.path().join("source");
        let clone_path = temp.path().join("clone");

        let repo = Repository::init(&source_path).expect("init source");
        commit_file(&repo, "README.md", "initial commit");

        let url = source_path.to_str().unwrap();
        let manager = GitManager::clone_or_reuse(url, None, &clone_path).expect("clone");
        assert!(clone_path.join(".git").exists());
        assert_eq!(manager.commit_count().expect("count"), 1);

        // Second call reuses the checkout instead of failing
        let reused = GitManager::clone_or_reuse(url, None, &clone_path).expect("reuse");
        assert_eq!(reused.repo_path(), clone_path.as_path());
    }

    #[test]
    fn test_commit_count_grows_with_history() {
        let temp = tempfile::tempdir().expect("tempdir");
        let repo_path = temp.path().join("repo");
        let repo = Repository::init(&repo_path).expect("init");

        commit_file(&repo, "a.txt", "one");
        commit_file(&repo, "b.txt", "two");
        commit_file(&repo, "c.txt", "three");

        let manager = GitManager::new(&repo_path).expect("manager");
        assert_eq!(manager.commit_count().expect("count"), 3);

        let head = manager.get_head_commit().expect("head");
        assert_eq!(head.len(), 40);
    }

    #[test]
    fn test_git_error_display() {
        let err = GitError::Clone("network down".to_string());
        assert_eq!(err.to_string(), "Clone error: network down");
    }
}
