//! Resource mirroring: populate a destination tree with links to the files of
//! a static-resource tree, creating only what is missing.
//!
//! The destination tree only ever grows. Directories are created as needed,
//! and nothing already present at a destination path is modified or removed,
//! so a mirror run is idempotent.
//!
//! The same create-if-absent policy ([`link_if_absent`]) provisions the two
//! page templates inside the repository ([`provision_templates`]).

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::BiblioConfig;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("static resource root {0} is not a directory")]
    MissingStaticRoot(PathBuf),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_err(path: impl Into<PathBuf>, source: io::Error) -> MirrorError {
    MirrorError::Io {
        path: path.into(),
        source,
    }
}

/// One static file and where its link goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Result of a create-if-absent link attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// Something was already at the destination before we tried.
    Existing,
    /// The destination appeared between the check and the link call.
    Raced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub created_dirs: Vec<PathBuf>,
    pub linked: Vec<ResourceEntry>,
    pub skipped: Vec<(ResourceEntry, LinkOutcome)>,
}

/// Where the tool's own shipped resources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLayout {
    pub static_root: PathBuf,
    pub template: PathBuf,
    pub bibtex_template: PathBuf,
}

impl ResourceLayout {
    /// `<dir>/static`, `<dir>/_template_.html` and `<dir>/_template_bibtex.html`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            static_root: dir.join("static"),
            template: dir.join("_template_.html"),
            bibtex_template: dir.join("_template_bibtex.html"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReport {
    pub link: PathBuf,
    pub target: PathBuf,
    pub outcome: LinkOutcome,
}

/// Links `destination` to `source` unless something already occupies
/// `destination`. Only errors other than "already exists" are returned.
pub fn link_if_absent(source: &Path, destination: &Path) -> io::Result<LinkOutcome> {
    if fs::symlink_metadata(destination).is_ok() {
        return Ok(LinkOutcome::Existing);
    }
    create_link(source, destination)
}

/// Something created `destination` after the pre-check: report `Raced` and
/// leave it alone.
fn create_link(source: &Path, destination: &Path) -> io::Result<LinkOutcome> {
    match symlink_file(source, destination) {
        Ok(()) => Ok(LinkOutcome::Linked),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(LinkOutcome::Raced),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink_file(source: &Path, destination: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(windows)]
fn symlink_file(source: &Path, destination: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, destination)
}

/// Mirrors every regular file under `static_root` into `destination_root`,
/// keeping paths relative to `static_root`.
pub fn mirror(static_root: &Path, destination_root: &Path) -> Result<MirrorReport, MirrorError> {
    if !static_root.is_dir() {
        error!(path = %static_root.display(), "Static resource root is not a directory");
        return Err(MirrorError::MissingStaticRoot(static_root.to_path_buf()));
    }
    let static_root = absolutize(static_root).map_err(|e| io_err(static_root, e))?;
    info!(
        source = %static_root.display(),
        destination = %destination_root.display(),
        "Mirroring static resources"
    );

    let mut report = MirrorReport::default();
    visit_dir(&static_root, Path::new(""), destination_root, &mut report)?;

    info!(
        linked = report.linked.len(),
        skipped = report.skipped.len(),
        created_dirs = report.created_dirs.len(),
        "Completed mirroring static resources"
    );
    Ok(report)
}

fn visit_dir(
    dir: &Path,
    relative: &Path,
    destination_root: &Path,
    report: &mut MirrorReport,
) -> Result<(), MirrorError> {
    let dest_dir = if relative.as_os_str().is_empty() {
        destination_root.to_path_buf()
    } else {
        destination_root.join(relative)
    };
    if ensure_dir(&dest_dir)? {
        report.created_dirs.push(dest_dir.clone());
    }

    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let source = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&source, e))?;
        if file_type.is_dir() {
            subdirs.push(entry.file_name());
            continue;
        }
        if !source.is_file() {
            debug!(path = %source.display(), "Not a regular file, ignoring");
            continue;
        }

        let resource = ResourceEntry {
            destination: dest_dir.join(entry.file_name()),
            source,
        };
        match link_if_absent(&resource.source, &resource.destination) {
            Ok(LinkOutcome::Linked) => {
                info!(
                    source = %resource.source.display(),
                    destination = %resource.destination.display(),
                    "symlink"
                );
                report.linked.push(resource);
            }
            Ok(outcome) => {
                info!(destination = %resource.destination.display(), ?outcome, "Skipping");
                report.skipped.push((resource, outcome));
            }
            Err(e) => {
                error!(
                    error = ?e,
                    source = %resource.source.display(),
                    destination = %resource.destination.display(),
                    "Failed to create symlink"
                );
                return Err(io_err(resource.destination, e));
            }
        }
    }

    for name in subdirs {
        visit_dir(&dir.join(&name), &relative.join(&name), destination_root, report)?;
    }
    Ok(())
}

/// Creates `dir` and its parents; true when something was created.
fn ensure_dir(dir: &Path) -> Result<bool, MirrorError> {
    if dir.is_dir() {
        debug!(path = %dir.display(), "Directory exists");
        return Ok(false);
    }
    match fs::create_dir_all(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "mkdir");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            error!(error = ?e, path = %dir.display(), "Failed to create directory");
            Err(io_err(dir, e))
        }
    }
}

/// Links the two page templates into the repository unless they already
/// exist there.
pub fn provision_templates(
    local_repository: &Path,
    config: &BiblioConfig,
    layout: &ResourceLayout,
) -> Result<Vec<TemplateReport>, MirrorError> {
    [
        (&config.template_file, &layout.template),
        (&config.bibtex_template_file, &layout.bibtex_template),
    ]
    .into_iter()
    .map(|(link, default)| provision_template(&local_repository.join(link), default))
    .collect()
}

fn provision_template(link: &Path, default: &Path) -> Result<TemplateReport, MirrorError> {
    let link = normalize_lexically(link);
    let target = absolutize(default).map_err(|e| io_err(default, e))?;
    if !target.is_file() {
        warn!(template = %target.display(), "Default template is missing, linking anyway");
    }
    if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let outcome = link_if_absent(&target, &link).map_err(|e| {
        error!(error = ?e, link = %link.display(), "Failed to link template");
        io_err(&link, e)
    })?;
    match outcome {
        LinkOutcome::Linked => {
            info!(template = %target.display(), link = %link.display(), "Symlinking template")
        }
        _ => debug!(link = %link.display(), ?outcome, "Template already present"),
    }
    Ok(TemplateReport {
        link,
        target,
        outcome,
    })
}

/// Joins relative paths onto the current directory, then normalises.
/// Symlinks are not resolved.
fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_lexically(path));
    }
    Ok(normalize_lexically(&std::env::current_dir()?.join(path)))
}

/// Removes `.` components and folds `name/..` pairs without touching the
/// filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
