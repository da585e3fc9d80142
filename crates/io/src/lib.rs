// Dataset store: CSV in, CSV out, records keyed by id

pub mod csv;
pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::DatasetStore;
