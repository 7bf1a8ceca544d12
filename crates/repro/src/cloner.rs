//! Repository cloning
//!
//! Accepts `file://` URLs (copy-tree, used by tests), and GitHub
//! https/http/git URLs (shallow clone, depth 1). Any other scheme or host
//! is rejected. If the target already contains the repository it is removed
//! first, so re-cloning an unchanged source is a no-op.

use arandu_common::errors::WorkerError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Clone a repository into `target_dir`, returning the path to the tree root.
pub async fn clone_repo(
    repo_url: &str,
    target_dir: &Path,
    job_id: &str,
) -> Result<PathBuf, WorkerError> {
    arandu_common::logging::log_step(Some(job_id), "clone_repo", async {
        if let Some(local) = repo_url.strip_prefix("file://") {
            return copy_local_repo(Path::new(local), target_dir).await;
        }

        let scheme = repo_url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| WorkerError::RepoClone(format!("Unsupported URL: {repo_url}")))?;

        if !matches!(scheme, "https" | "http" | "git") {
            return Err(WorkerError::RepoClone(format!("Unsupported URL scheme: {scheme}")));
        }

        let host = repo_url
            .split_once("://")
            .and_then(|(_, rest)| rest.split('/').next())
            .unwrap_or_default();
        if !is_github_host(host) {
            return Err(WorkerError::RepoClone(format!(
                "Only GitHub repositories are supported, got: {host}"
            )));
        }

        tokio::fs::create_dir_all(target_dir).await.map_err(|e| {
            WorkerError::RepoClone(format!("Cannot create clone target: {e}"))
        })?;

        let repo_path = target_dir.join(repo_name(repo_url));
        if repo_path.exists() {
            tokio::fs::remove_dir_all(&repo_path).await.map_err(|e| {
                WorkerError::RepoClone(format!("Cannot clear existing clone: {e}"))
            })?;
        }

        let output = Command::new("git")
            .args(["clone", "--depth", "1", repo_url])
            .arg(&repo_path)
            .output()
            .await
            .map_err(|e| WorkerError::RepoClone(format!("Failed to spawn git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::RepoClone(format!(
                "Git clone failed: {}",
                stderr.trim()
            )));
        }

        info!(repo_url, path = %repo_path.display(), "Cloned repository");
        Ok(repo_path)
    })
    .await
}

async fn copy_local_repo(source: &Path, target_dir: &Path) -> Result<PathBuf, WorkerError> {
    if !source.exists() {
        return Err(WorkerError::RepoClone(format!(
            "Source path does not exist: {}",
            source.display()
        )));
    }
    if !source.is_dir() {
        return Err(WorkerError::RepoClone(format!(
            "Source path is not a directory: {}",
            source.display()
        )));
    }

    tokio::fs::create_dir_all(target_dir)
        .await
        .map_err(|e| WorkerError::RepoClone(format!("Cannot create clone target: {e}")))?;

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string());
    let repo_path = target_dir.join(name);
    if repo_path.exists() {
        tokio::fs::remove_dir_all(&repo_path)
            .await
            .map_err(|e| WorkerError::RepoClone(format!("Cannot clear existing clone: {e}")))?;
    }

    let source = source.to_path_buf();
    let dest = repo_path.clone();
    tokio::task::spawn_blocking(move || copy_tree(&source, &dest))
        .await
        .map_err(|e| WorkerError::RepoClone(format!("Copy task failed: {e}")))?
        .map_err(|e| WorkerError::RepoClone(format!("Copy failed: {e}")))?;

    info!(source = %repo_path.display(), "Copied local repository");
    Ok(repo_path)
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(source) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// GitHub host check; subdomains of github.com are accepted
fn is_github_host(host: &str) -> bool {
    host == "github.com" || host.ends_with(".github.com")
}

/// Derive the repository directory name from its URL
fn repo_name(repo_url: &str) -> String {
    let last = repo_url.trim_end_matches('/').rsplit('/').next().unwrap_or("repo");
    last.trim_end_matches(".git").to_string()
}

/// Idempotent removal of a cloned tree. Failures are logged, not raised.
pub async fn cleanup_repo(repo_path: &Path, job_id: &str) {
    if repo_path.exists() {
        match tokio::fs::remove_dir_all(repo_path).await {
            Ok(()) => info!(job_id, path = %repo_path.display(), "Cleaned up repository"),
            Err(e) => warn!(job_id, path = %repo_path.display(), error = %e, "Failed to clean up repository"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("https://github.com/user/repo"), "repo");
        assert_eq!(repo_name("https://github.com/user/repo.git"), "repo");
        assert_eq!(repo_name("https://github.com/user/repo/"), "repo");
    }

    #[test]
    fn test_github_host_check() {
        assert!(is_github_host("github.com"));
        assert!(is_github_host("www.github.com"));
        assert!(!is_github_host("evil-github.com"));
        assert!(!is_github_host("github.com.evil.org"));
    }

    #[tokio::test]
    async fn test_rejects_non_github_host() {
        let dir = tempfile::tempdir().unwrap();
        let err = clone_repo("https://gitlab.com/user/repo", dir.path(), "job-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Only GitHub repositories"));
    }

    #[tokio::test]
    async fn test_rejects_unknown_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let err = clone_repo("ftp://github.com/user/repo", dir.path(), "job-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme"));
    }

    #[tokio::test]
    async fn test_file_url_copies_tree() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("main.py"), "print('hi')").unwrap();
        std::fs::create_dir(source.path().join("src")).unwrap();
        std::fs::write(source.path().join("src/lib.py"), "x = 1").unwrap();

        let target = tempfile::tempdir().unwrap();
        let url = format!("file://{}", source.path().display());
        let repo_path = clone_repo(&url, target.path(), "job-1").await.unwrap();

        assert!(repo_path.join("main.py").exists());
        assert!(repo_path.join("src/lib.py").exists());
    }

    #[tokio::test]
    async fn test_reclone_replaces_existing_tree() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("main.py"), "print('v1')").unwrap();

        let target = tempfile::tempdir().unwrap();
        let url = format!("file://{}", source.path().display());
        let first = clone_repo(&url, target.path(), "job-1").await.unwrap();
        std::fs::write(first.join("stale.txt"), "leftover").unwrap();

        let second = clone_repo(&url, target.path(), "job-1").await.unwrap();
        assert_eq!(first, second);
        assert!(!second.join("stale.txt").exists());
        assert!(second.join("main.py").exists());
    }

    #[tokio::test]
    async fn test_missing_local_source() {
        let target = tempfile::tempdir().unwrap();
        let err = clone_repo("file:///definitely/not/here", target.path(), "job-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("clone");
        std::fs::create_dir(&repo).unwrap();

        cleanup_repo(&repo, "job-1").await;
        assert!(!repo.exists());
        // Second call on a missing tree is a no-op.
        cleanup_repo(&repo, "job-1").await;
    }
}
