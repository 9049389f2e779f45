// Integration test for the git-backed downloader.
// Builds a throwaway local repository, then clones and pulls it.

use std::fs;
use std::path::Path;
use std::process::Command;

use biblio_sync_core::contract::{DownloadError, Downloader, GitSource, SyncAction};
use biblio_sync_core::download::GitDownloader;
use tempfile::tempdir;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.org"])
        .args(args)
        .status()
        .expect("git must be installed for download tests");
    assert!(status.success(), "git {args:?} failed");
}

fn commit_file(repo: &Path, name: &str, content: &str) {
    fs::write(repo.join(name), content).unwrap();
    git(repo, &["add", name]);
    git(repo, &["commit", "--quiet", "-m", name]);
}

#[tokio::test]
async fn test_clone_then_pull_picks_up_new_commits() {
    let tmp = tempdir().unwrap();
    let remote = tmp.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--quiet"]);
    commit_file(&remote, "a.bib", "@misc{a}\n");

    let source = GitSource {
        repo_url: remote.display().to_string(),
        local_dir: tmp.path().join("repositories/remote"),
        reference: None,
    };
    let downloader = GitDownloader::new();

    let first = downloader.download(&source).await.expect("clone should succeed");
    assert_eq!(first.action, SyncAction::Cloned);
    assert_eq!(first.local_path, source.local_dir);
    assert!(source.local_dir.join("a.bib").is_file());

    commit_file(&remote, "b.bib", "@misc{b}\n");
    let second = downloader.download(&source).await.expect("pull should succeed");
    assert_eq!(second.action, SyncAction::Pulled);
    assert!(source.local_dir.join("b.bib").is_file());
}

#[tokio::test]
async fn test_clone_follows_reference() {
    let tmp = tempdir().unwrap();
    let remote = tmp.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--quiet"]);
    commit_file(&remote, "main.bib", "@misc{main}\n");
    git(&remote, &["checkout", "--quiet", "-b", "drafts"]);
    commit_file(&remote, "draft.bib", "@misc{draft}\n");

    let source = GitSource {
        repo_url: remote.display().to_string(),
        local_dir: tmp.path().join("work"),
        reference: Some("drafts".to_string()),
    };
    GitDownloader::new().download(&source).await.expect("clone should succeed");

    assert!(source.local_dir.join("draft.bib").is_file());
}

#[tokio::test]
async fn test_missing_remote_is_a_git_failure() {
    let tmp = tempdir().unwrap();
    let source = GitSource {
        repo_url: tmp.path().join("nothing-here").display().to_string(),
        local_dir: tmp.path().join("work"),
        reference: None,
    };

    let err = GitDownloader::new().download(&source).await.unwrap_err();

    assert!(
        matches!(err, DownloadError::GitFailed { operation: "clone", .. }),
        "unexpected error: {err:?}"
    );
    assert!(!source.local_dir.exists());
}
