use std::path::Path;

use tokio::process::Command;

use crate::contract::{DownloadError, DownloadedRepository, Downloader, GitSource, SyncAction};

/// Downloader backed by the `git` executable on `PATH`.
///
/// Clones when the working copy is missing, pulls from the remote otherwise.
#[derive(Debug, Clone, Default)]
pub struct GitDownloader;

impl GitDownloader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Downloader for GitDownloader {
    async fn download(&self, source: &GitSource) -> Result<DownloadedRepository, DownloadError> {
        let local_dir = &source.local_dir;
        let action = if local_dir.is_dir() {
            pull(source).await?;
            SyncAction::Pulled
        } else {
            clone(source).await?;
            SyncAction::Cloned
        };
        Ok(DownloadedRepository {
            local_path: local_dir.clone(),
            action,
        })
    }
}

/// `git clone [--branch <reference>] <repo_url> <local_dir>`
async fn clone(source: &GitSource) -> Result<(), DownloadError> {
    let mut command = Command::new("git");
    command.arg("clone");
    if let Some(reference) = &source.reference {
        command.arg("--branch").arg(reference);
    }
    command.arg(&source.repo_url).arg(&source.local_dir);
    run_git(command, "clone", source, &source.local_dir).await
}

/// `git -C <local_dir> pull <repo_url> [<reference>]`
async fn pull(source: &GitSource) -> Result<(), DownloadError> {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(&source.local_dir)
        .arg("pull")
        .arg(&source.repo_url);
    if let Some(reference) = &source.reference {
        command.arg(reference);
    }
    run_git(command, "pull", source, &source.local_dir).await
}

async fn run_git(
    mut command: Command,
    operation: &'static str,
    source: &GitSource,
    path: &Path,
) -> Result<(), DownloadError> {
    let repo_url = source.repo_url.as_str();
    let reference = source.reference.as_deref().unwrap_or("<default>");

    match command.status().await {
        Ok(s) if s.success() => {
            tracing::info!(
                repo_url = repo_url,
                reference = reference,
                path = %path.display(),
                status = ?s,
                "git {} succeeded", operation
            );
            Ok(())
        }
        Ok(s) => {
            tracing::error!(
                repo_url = repo_url,
                reference = reference,
                path = %path.display(),
                "git {} exited with non-zero code: {}", operation, s
            );
            Err(DownloadError::GitFailed {
                operation,
                repo_url: repo_url.to_string(),
                status: s,
            })
        }
        Err(e) => {
            tracing::error!(
                error = ?e,
                repo_url = repo_url,
                reference = reference,
                path = %path.display(),
                "Failed to launch git {}", operation
            );
            Err(DownloadError::Spawn {
                operation,
                source: e,
            })
        }
    }
}
