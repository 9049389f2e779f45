//! Bibliography aggregation: every valid `.bib` file under a repository,
//! concatenated into one master bibliography.
//!
//! # Walk order
//! Entries of each directory are sorted by file name. A directory's files are
//! handled before its subdirectories, so the output is reproducible across
//! platforms and filesystems.
//!
//! # What counts as a candidate
//! - extension exactly `bib` (case-sensitive);
//! - resolves to a regular file (symlinked files count, symlinked directories
//!   are not followed);
//! - not the master output itself, which usually lives in the same tree;
//! - not inside a `.git` directory.
//!
//! # Errors
//! A file failing validation is skipped and reported; it never stops the run.
//! I/O failures (unreadable candidate, unwritable output) abort the run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::contract::{BibFile, ValidationError, Validator};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> AggregateError {
    AggregateError::Io {
        path: path.into(),
        source,
    }
}

/// A candidate that failed validation and was left out of the master file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBib {
    pub path: PathBuf,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub master_path: PathBuf,
    /// Files whose content was appended, in output order.
    pub included: Vec<PathBuf>,
    pub skipped: Vec<SkippedBib>,
    pub bytes_written: u64,
}

/// Output handle plus the report, threaded through the walk.
struct Accumulator<'v, V: ?Sized> {
    validator: &'v V,
    master_canonical: PathBuf,
    out: BufWriter<File>,
    report: AggregateReport,
}

/// Concatenates every valid bib file under `root_dir` into
/// `root_dir.join(master_bib)`, truncating any previous master file.
///
/// An absolute `master_bib` is used as given.
pub fn aggregate<V>(
    root_dir: &Path,
    master_bib: &Path,
    validator: &V,
) -> Result<AggregateReport, AggregateError>
where
    V: Validator + ?Sized,
{
    if !root_dir.is_dir() {
        error!(path = %root_dir.display(), "Bibliography root is not a directory");
        return Err(AggregateError::NotADirectory(root_dir.to_path_buf()));
    }

    let master_path = root_dir.join(master_bib);
    info!(root = %root_dir.display(), master = %master_path.display(), "Writing master bibliography");

    let file = File::create(&master_path).map_err(|e| {
        error!(error = ?e, path = %master_path.display(), "Failed to create master bibliography");
        io_err(&master_path, e)
    })?;
    let master_canonical = fs::canonicalize(&master_path).map_err(|e| io_err(&master_path, e))?;

    let mut acc = Accumulator {
        validator,
        master_canonical,
        out: BufWriter::new(file),
        report: AggregateReport {
            master_path: master_path.clone(),
            ..AggregateReport::default()
        },
    };

    visit_dir(root_dir, &mut acc)?;

    acc.out.flush().map_err(|e| {
        error!(error = ?e, path = %master_path.display(), "Failed to flush master bibliography");
        io_err(&master_path, e)
    })?;

    let report = acc.report;
    info!(
        included = report.included.len(),
        skipped = report.skipped.len(),
        bytes = report.bytes_written,
        "Completed master bibliography"
    );
    Ok(report)
}

fn visit_dir<V>(dir: &Path, acc: &mut Accumulator<'_, V>) -> Result<(), AggregateError>
where
    V: Validator + ?Sized,
{
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                debug!(path = %path.display(), "Skipping directory");
                continue;
            }
            subdirs.push(path);
        } else if is_candidate(&path) {
            visit_candidate(path, acc)?;
        }
    }

    for subdir in subdirs {
        visit_dir(&subdir, acc)?;
    }
    Ok(())
}

fn is_candidate(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bib") && path.is_file()
}

fn visit_candidate<V>(path: PathBuf, acc: &mut Accumulator<'_, V>) -> Result<(), AggregateError>
where
    V: Validator + ?Sized,
{
    if fs::canonicalize(&path).is_ok_and(|canonical| canonical == acc.master_canonical) {
        debug!(path = %path.display(), "Skipping master bibliography itself");
        return Ok(());
    }

    info!(path = %path.display(), "Checking");
    let content = fs::read(&path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read bib file");
        io_err(&path, e)
    })?;
    let file = BibFile { path, content };

    match acc.validator.validate(&file) {
        Ok(summary) => {
            acc.out
                .write_all(&file.content)
                .map_err(|e| io_err(&acc.report.master_path, e))?;
            acc.report.bytes_written += file.content.len() as u64;
            debug!(path = %file.path.display(), entries = summary.entries, "Appended bib file");
            acc.report.included.push(file.path);
        }
        Err(e) => {
            warn!(path = %file.path.display(), error = %e, "Skipping bib file because of errors");
            acc.report.skipped.push(SkippedBib {
                path: file.path,
                error: e,
            });
        }
    }
    Ok(())
}
