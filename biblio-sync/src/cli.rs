//! # biblio-sync CLI Interface (Module)
//!
//! Command parsing and the async entrypoint. All publishing logic lives in
//! `biblio-sync-core`; this module maps arguments onto a
//! [`SynchroniseConfig`] and reports the outcome.
//!
//! - [`Cli`] defines the user-facing subcommands.
//! - [`run`] is shared by `main` and the integration tests.
use std::path::{Path, PathBuf};

use anyhow::Result;
use biblio_sync_core::config::DEFAULT_CONFIG_NAME;
use biblio_sync_core::contract::GitSource;
use biblio_sync_core::download::GitDownloader;
use biblio_sync_core::mirror::ResourceLayout;
use biblio_sync_core::synchronise::{synchronise, SynchroniseConfig};
use biblio_sync_core::validate::BibtexValidator;
use clap::{Parser, Subcommand};

/// CLI for biblio-sync: publish a repository of bib files.
#[derive(Parser)]
#[clap(
    name = "biblio-sync",
    version,
    about = "Sync a git repository of bib files, build the master bibliography and mirror static resources"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone or pull the repository, then publish it
    ///
    /// The repository config is YAML and defaults to `bibliography.yaml`.
    /// A `bibliography.cfg` from older setups is not read; convert it to YAML
    /// with the same upper-case keys.
    Sync {
        /// Remote git repository
        remote: String,
        /// Local working copy; derived from the remote when omitted
        local_dir: Option<PathBuf>,
        /// Config file name inside the working copy (YAML, formerly `bibliography.cfg`)
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        config_name: PathBuf,
        /// Directory holding `static/` and the default templates
        #[clap(long, default_value = ".")]
        resources: PathBuf,
        /// Branch or tag to follow
        #[clap(long)]
        reference: Option<String>,
    },
}

/// Working copy location when none is given: the last path segment of the
/// remote, or `repositories/<name>` when the remote ends in `.git`.
pub fn default_local_dir(remote: &str) -> PathBuf {
    let trimmed = remote.trim_end_matches('/');
    let basename = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    match Path::new(basename).extension() {
        Some(ext) if ext == "git" => {
            let stem = Path::new(basename)
                .file_stem()
                .map(PathBuf::from)
                .unwrap_or_default();
            Path::new("repositories").join(stem)
        }
        _ => PathBuf::from(basename),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            remote,
            local_dir,
            config_name,
            resources,
            reference,
        } => {
            let local_dir = local_dir.unwrap_or_else(|| default_local_dir(&remote));
            tracing::info!(
                command = "sync",
                remote = %remote,
                local_dir = %local_dir.display(),
                "Starting synchronisation process"
            );
            let config = SynchroniseConfig {
                source: GitSource {
                    repo_url: remote,
                    local_dir,
                    reference,
                },
                config_name,
                resources: ResourceLayout::from_dir(resources),
            };

            match synchronise(&config, &GitDownloader::new(), &BibtexValidator::new()).await {
                Ok(report) => {
                    tracing::info!(
                        command = "sync",
                        master = %report.bibliography.master_path.display(),
                        included = report.bibliography.included.len(),
                        skipped = report.bibliography.skipped.len(),
                        linked = report.resources.linked.len(),
                        "Synchronisation complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(e.into())
                }
            }
        }
    }
}
