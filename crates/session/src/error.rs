use std::fmt;

use dedupe_io::StoreError;
use thiserror::Error;

/// What an out-of-range operator number referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Record,
    Field,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Record => f.write_str("record"),
            Reference::Field => f.write_str("field"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Operator typed a position outside `1..=max`. Recoverable.
    #[error("no {what} number {position} (valid: 1-{max})")]
    InvalidReference {
        what: Reference,
        position: usize,
        max: usize,
    },

    /// The session has already ended.
    #[error("no active group")]
    Finished,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Errors that mean the in-memory state can no longer be trusted.
    ///
    /// Everything an operator can trigger from the prompt is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Store(StoreError::DuplicateId(_)) | SessionError::Store(StoreError::Load { .. })
        )
    }
}
