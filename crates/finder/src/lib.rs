//! `dedupe-finder` — duplicate detection over a loaded dataset.
//!
//! Pure engine crate: receives the dataset store, returns ordered groups.
//! No CLI or terminal dependencies.

pub mod engine;
pub mod filter;

pub use engine::{find, find_with_summary, FinderOutput, FinderSummary};
pub use filter::{is_pobox, FinderFilters};
