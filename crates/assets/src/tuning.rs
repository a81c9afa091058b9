use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use towerdef_kernel::{FlockParams, SimConfig};

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Flocking weights and clock settings read from `--params <file.json>`.
/// Missing sections and fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningFile {
    pub flock: FlockParams,
    pub sim: SimConfig,
}

impl TuningFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = serde_json::from_str(&text).map_err(|source| TuningError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?tuning, "tuning loaded");
        Ok(tuning)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, TuningError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.json");
        std::fs::write(&path, r#"{"flock": {"sight_range": 5.0}, "sim": {"seed": 9}}"#).unwrap();

        let tuning = TuningFile::load(&path).unwrap();
        assert_eq!(tuning.flock.sight_range, 5.0);
        assert_eq!(tuning.flock.desired_spacing, FlockParams::default().desired_spacing);
        assert_eq!(tuning.sim.seed, 9);
        assert_eq!(tuning.sim.fixed_step, SimConfig::default().fixed_step);
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(TuningFile::load_or_default(None).unwrap(), TuningFile::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = TuningFile::load(&path).unwrap_err();
        assert!(matches!(err, TuningError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}
