//! Runner configuration: where specs and helpers live.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use testrig_core::HarnessError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to read runner config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid runner config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to walk spec directory: {0}")]
    Walk(#[from] glob::GlobError),
}

impl From<RunnerError> for HarnessError {
    fn from(err: RunnerError) -> Self {
        HarnessError::config(err.to_string())
    }
}

/// Which files make up a test run.
///
/// Patterns are relative to `spec_dir`. Results come back sorted so runs are
/// reproducible unless `random` is set by the caller's runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub spec_dir: PathBuf,
    pub spec_files: Vec<String>,
    pub helpers: Vec<String>,
    #[serde(alias = "stopSpecOnExpectationFailure")]
    pub stop_spec_on_expectation_failure: bool,
    pub random: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            spec_dir: PathBuf::from("spec"),
            spec_files: vec!["**/*[sS]pec.*".to_string()],
            helpers: vec!["helpers/**/*".to_string()],
            stop_spec_on_expectation_failure: false,
            random: false,
        }
    }
}

impl RunnerConfig {
    /// Default patterns rooted at `spec_dir`.
    pub fn new(spec_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec_dir: spec_dir.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RunnerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Spec files matched by `spec_files`, sorted, helpers excluded.
    pub fn spec_paths(&self) -> Result<Vec<PathBuf>, RunnerError> {
        let helpers: BTreeSet<PathBuf> = self.expand(&self.helpers)?;
        let specs = self.expand(&self.spec_files)?;
        Ok(specs.difference(&helpers).cloned().collect())
    }

    /// Helper files matched by `helpers`, sorted.
    pub fn helper_paths(&self) -> Result<Vec<PathBuf>, RunnerError> {
        Ok(self.expand(&self.helpers)?.into_iter().collect())
    }

    fn expand(&self, patterns: &[String]) -> Result<BTreeSet<PathBuf>, RunnerError> {
        let mut found = BTreeSet::new();
        for pattern in patterns {
            let full = self.spec_dir.join(pattern);
            for entry in glob::glob(&full.to_string_lossy())? {
                let path = entry?;
                if path.is_file() {
                    found.insert(path);
                }
            }
        }
        debug!(dir = %self.spec_dir.display(), ?patterns, matched = found.len(), "expanded file patterns");
        Ok(found)
    }
}
