//! High-level pipeline: download -> config -> aggregate -> templates -> mirror.
//!
//! # Responsibilities
//! - Brings the working copy up to date through a [`Downloader`]; a failure
//!   here is fatal and nothing else runs.
//! - Loads the repository's own configuration and surfaces its warnings.
//! - Writes the master bibliography, provisions the templates and mirrors the
//!   static resources, in that order.
//!
//! # Error Handling
//! Each fatal step returns immediately with a [`SynchroniseError`]. Per-file
//! validation failures and existing destination files are not errors; they
//! show up in the [`SynchroniseReport`].

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::aggregate::{aggregate, AggregateError, AggregateReport};
use crate::config::{load_config, ConfigError, ConfigWarning};
use crate::contract::{DownloadError, Downloader, GitSource, SyncAction, Validator};
use crate::mirror::{
    mirror, provision_templates, MirrorError, MirrorReport, ResourceLayout, TemplateReport,
};

/// The top-level synchronise configuration.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    pub source: GitSource,
    /// Config file name, relative to the working copy.
    pub config_name: PathBuf,
    pub resources: ResourceLayout,
}

#[derive(Debug)]
pub struct SynchroniseReport {
    pub repository: PathBuf,
    pub action: SyncAction,
    pub config_warnings: Vec<ConfigWarning>,
    pub bibliography: AggregateReport,
    pub templates: Vec<TemplateReport>,
    pub resources: MirrorReport,
}

#[derive(Debug, Error)]
pub enum SynchroniseError {
    #[error("repository synchronisation failed: {0}")]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("writing master bibliography failed: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("provisioning templates failed: {0}")]
    Templates(#[source] MirrorError),
    #[error("mirroring static resources failed: {0}")]
    Mirror(#[source] MirrorError),
}

pub async fn synchronise<D, V>(
    config: &SynchroniseConfig,
    downloader: &D,
    validator: &V,
) -> Result<SynchroniseReport, SynchroniseError>
where
    D: Downloader + ?Sized,
    V: Validator + ?Sized,
{
    info!(repo_url = %config.source.repo_url, "[SYNC] Starting synchronisation pipeline");

    // Step 1: Download
    let downloaded = downloader.download(&config.source).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Download failed");
        e
    })?;
    let repository = downloaded.local_path;
    info!(path = %repository.display(), action = ?downloaded.action, "[SYNC] Repository up to date");

    // Step 2: Repository config
    let repo_config = load_config(repository.join(&config.config_name))?;
    let config_warnings = repo_config.warnings();
    for warning in &config_warnings {
        warn!(%warning, "[SYNC] Configuration warning");
    }

    // Step 3: Master bibliography
    let bibliography = aggregate(&repository, &repo_config.master_bib, validator)?;
    for skipped in &bibliography.skipped {
        warn!(path = %skipped.path.display(), error = %skipped.error, "[SYNC] Left out of master bibliography");
    }

    // Step 4: Templates
    let templates = provision_templates(&repository, &repo_config, &config.resources)
        .map_err(SynchroniseError::Templates)?;

    // Step 5: Static resources
    let output_dir = repository.join(&repo_config.output_dir);
    let resources =
        mirror(&config.resources.static_root, &output_dir).map_err(SynchroniseError::Mirror)?;

    info!(
        included = bibliography.included.len(),
        skipped = bibliography.skipped.len(),
        linked = resources.linked.len(),
        "[SYNC] Synchronisation complete"
    );
    Ok(SynchroniseReport {
        repository,
        action: downloaded.action,
        config_warnings,
        bibliography,
        templates,
        resources,
    })
}
