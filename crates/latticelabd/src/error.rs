use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine the OS data directory")]
    NoDataDir,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
