use std::io;
use std::path::PathBuf;

use os_api::OsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Os(#[from] OsError),
    #[error("invalid filesystem type pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot access config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config {path:?}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ProbeError {
    /// True for a level outside realtime/normal/idle.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ProbeError::Os(OsError::InvalidArgument(_)))
    }
}
