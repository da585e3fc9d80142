use std::io;
use std::path::PathBuf;

use dedupe_core::{RecordId, UnknownField};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Source missing, malformed, or with a non-unique id column. Fatal at startup.
    #[error("cannot load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error(transparent)]
    UnknownField(#[from] UnknownField),

    /// Restoring over a live record.
    #[error("record {0} already exists")]
    DuplicateId(RecordId),

    /// Save destination not writable.
    #[error("cannot save {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
