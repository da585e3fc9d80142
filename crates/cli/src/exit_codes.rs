//! CLI Exit Code Registry
//!
//! Single source of truth for `dedupe` exit codes. Scripts that run
//! `dedupe --report` rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad arguments)                      |
//! | 3    | Dataset could not be loaded                      |
//! | 4    | Dataset could not be written (non-interactive)   |
//! | 5    | Terminal could not be driven                     |

use dedupe_io::StoreError;
use dedupe_session::SessionError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Dataset missing, unreadable, or malformed.
pub const EXIT_LOAD: u8 = 3;

/// Writing the dataset or log file failed outside an interactive session.
pub const EXIT_PERSISTENCE: u8 = 4;

/// Raw mode, alternate screen, or event read failed.
pub const EXIT_TERMINAL: u8 = 5;

/// Map a store error to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::Load { .. } | StoreError::DuplicateId(_) => EXIT_LOAD,
        StoreError::Persistence { .. } => EXIT_PERSISTENCE,
        StoreError::NotFound(_) | StoreError::UnknownField(_) => EXIT_ERROR,
    }
}

/// Map a session error to its exit code.
pub fn session_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::Store(e) => store_exit_code(e),
        SessionError::InvalidReference { .. } | SessionError::Finished => EXIT_ERROR,
    }
}
