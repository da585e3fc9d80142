//! `dedupe-core` — shared record types.
//!
//! The fixed column schema, cell values, records keyed by id, and the
//! duplicate groups the finder produces. No IO.

pub mod group;
pub mod record;
pub mod schema;
pub mod value;

pub use group::DuplicateGroup;
pub use record::{CompositeKey, Record, RecordId};
pub use schema::{Column, Field, UnknownField, COLUMNS, ID_COLUMN};
pub use value::{Value, DATE_FORMAT};
