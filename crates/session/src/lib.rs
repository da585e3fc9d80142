//! `dedupe-session`: interactive mediation of duplicate groups.
//!
//! Owns the dataset for the length of a session, applies operator commands
//! one at a time, and keeps a per-group undo stack. Rendering is left to the
//! caller through [`GroupView`].

pub mod command;
pub mod error;
pub mod history;
pub mod session;
pub mod view;

pub use command::{Command, HELP};
pub use error::{Reference, SessionError};
pub use history::{Edit, EditHistory};
pub use session::{EditSession, Outcome, SessionState};
pub use view::{GroupView, ViewCell, ViewRow};
