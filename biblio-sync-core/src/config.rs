//! Repository configuration: where the pipeline writes inside the working copy.
//!
//! The configuration file lives in the synchronised repository itself and is a
//! YAML mapping of upper-case keys:
//!
//! ```yaml
//! MASTER_BIB: ./anonbib.bib
//! OUTPUT_DIR: site
//! TEMPLATE_FILE: ./_template_.html
//! BIBTEX_TEMPLATE_FILE: ./_template_bibtex.html
//! ```
//!
//! Every key is optional; unknown keys are ignored so the file can carry
//! settings for other tools.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

/// File name looked up inside the repository when none is given.
pub const DEFAULT_CONFIG_NAME: &str = "bibliography.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiblioConfig {
    /// Master bibliography, relative to the repository root.
    #[serde(rename = "MASTER_BIB")]
    pub master_bib: PathBuf,
    /// Directory receiving the mirrored static resources.
    #[serde(rename = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
    #[serde(rename = "TEMPLATE_FILE")]
    pub template_file: PathBuf,
    #[serde(rename = "BIBTEX_TEMPLATE_FILE")]
    pub bibtex_template_file: PathBuf,
}

impl Default for BiblioConfig {
    fn default() -> Self {
        Self {
            master_bib: PathBuf::from("./anonbib.bib"),
            output_dir: PathBuf::from("."),
            template_file: PathBuf::from("./_template_.html"),
            bibtex_template_file: PathBuf::from("./_template_bibtex.html"),
        }
    }
}

/// A setting that is suspicious but does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The key must be relative to the repository; the value is used as given.
    AbsolutePath { key: &'static str, value: PathBuf },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::AbsolutePath { key, value } => write!(
                f,
                "{key} must not be an absolute path! It is currently {}",
                value.display()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config YAML {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl BiblioConfig {
    /// Settings that must be repository-relative but are absolute.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        [
            ("MASTER_BIB", &self.master_bib),
            ("OUTPUT_DIR", &self.output_dir),
            ("TEMPLATE_FILE", &self.template_file),
            ("BIBTEX_TEMPLATE_FILE", &self.bibtex_template_file),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_absolute())
        .map(|(key, value)| ConfigWarning::AbsolutePath {
            key,
            value: value.clone(),
        })
        .collect()
    }

    pub fn trace_loaded(&self) {
        info!(
            master_bib = %self.master_bib.display(),
            output_dir = %self.output_dir.display(),
            "Loaded bibliography config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// Loads a YAML config file. An empty file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BiblioConfig, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        ConfigError::Read {
            path: path_ref.to_path_buf(),
            source: e,
        }
    })?;

    if content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty, using defaults");
        return Ok(BiblioConfig::default());
    }

    let config: BiblioConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source: e,
        }
    })?;
    config.trace_loaded();
    Ok(config)
}
