//! # contract: seams between the publishing pipeline and its collaborators
//!
//! This module defines the two traits the pipeline depends on, plus the plain
//! data types that flow across them:
//!
//! - [`Validator`]: decides whether a bib file is syntactically well formed.
//! - [`Downloader`]: makes sure a local working copy of the remote repository
//!   exists and is up to date.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; with the default
//!   `test-export-mocks` feature the generated `MockValidator` and
//!   `MockDownloader` are exported for integration tests.
//!
//! ## Implementations
//! - [`crate::validate::BibtexValidator`] implements [`Validator`].
//! - [`crate::download::GitDownloader`] implements [`Downloader`].

use std::path::PathBuf;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// A candidate bibliography file, read once from disk.
#[derive(Debug, Clone)]
pub struct BibFile {
    pub path: PathBuf,
    /// Raw bytes exactly as stored; this is what ends up in the master file.
    pub content: Vec<u8>,
}

/// What a successful validation learned about the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BibSummary {
    /// Number of citable entries (`@string`, `@preamble` and `@comment` excluded).
    pub entries: usize,
}

/// Why a bib file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Syntactic check for bibliography data.
///
/// A failure is a per-file verdict; callers treat it as "skip this file",
/// never as a reason to stop.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Validator: Send + Sync {
    fn validate(&self, file: &BibFile) -> Result<BibSummary, ValidationError>;
}

/// Remote repository to synchronise and where its working copy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub repo_url: String,
    pub local_dir: PathBuf,
    /// Branch or tag to follow; `None` uses the remote's default.
    pub reference: Option<String>,
}

/// How the working copy was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Cloned,
    Pulled,
}

/// Result of a successful download: the working copy to publish from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedRepository {
    pub local_path: PathBuf,
    pub action: SyncAction,
}

/// Repository synchronisation failures. All of them abort the run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to launch git {operation}: {source}")]
    Spawn {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("git {operation} of {repo_url} exited with {status}")]
    GitFailed {
        operation: &'static str,
        repo_url: String,
        status: std::process::ExitStatus,
    },
}

/// Trait for bringing a local working copy in line with its remote.
/// Allows plugging in the real git-backed downloader or a mock.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Clone or update `source`, returning where the working copy lives.
    async fn download(&self, source: &GitSource) -> Result<DownloadedRepository, DownloadError>;
}
