//! Cross-platform application paths

use std::fs;
use std::path::PathBuf;

use crate::error::DaemonError;

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, DaemonError> {
        let base = dirs::data_dir().ok_or(DaemonError::NoDataDir)?;
        Self::at(base.join("latticelab"))
    }

    /// Use `data_dir` directly, creating it when missing.
    pub fn at(data_dir: PathBuf) -> Result<Self, DaemonError> {
        fs::create_dir_all(&data_dir).map_err(|source| DaemonError::Io {
            path: data_dir.clone(),
            source,
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn cells_config_file(&self) -> PathBuf {
        self.data_dir.join("cells.json")
    }
}
