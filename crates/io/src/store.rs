use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use dedupe_core::{Field, Record, RecordId, Value};

use crate::csv::{parse_records, read_file_as_utf8, write_records};
use crate::error::StoreError;

/// In-memory dataset indexed by record id.
///
/// Iteration and saving are always in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetStore {
    records: BTreeMap<RecordId, Record>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records, rejecting repeated ids.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for record in records {
            store.restore(record)?;
        }
        Ok(store)
    }

    /// Load a CSV dataset from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = read_file_as_utf8(path).map_err(|e| StoreError::load(path, e))?;
        let store = Self::from_csv_str(&content, path)?;
        log::info!("loaded {} record(s) from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parse CSV text. `origin` is only used in error messages.
    pub fn from_csv_str(content: &str, origin: &Path) -> Result<Self, StoreError> {
        let records = parse_records(content).map_err(|e| StoreError::load(origin, e))?;
        Self::from_records(records).map_err(|e| match e {
            StoreError::DuplicateId(id) => {
                StoreError::load(origin, format!("duplicate id {id}"))
            }
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: RecordId) -> Result<&Record, StoreError> {
        self.records.get(&id).ok_or(StoreError::NotFound(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Overwrite one field; returns the value it replaced.
    pub fn set_field(&mut self, id: RecordId, field: Field, value: Value) -> Result<Value, StoreError> {
        let record = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(record.set(field, value))
    }

    /// Same as [`set_field`](Self::set_field), resolving the column by name.
    pub fn set_field_named(&mut self, id: RecordId, field: &str, value: Value) -> Result<Value, StoreError> {
        let field: Field = field.parse()?;
        self.set_field(id, field, value)
    }

    /// Remove a record entirely, returning it.
    pub fn delete(&mut self, id: RecordId) -> Result<Record, StoreError> {
        self.records.remove(&id).ok_or(StoreError::NotFound(id))
    }

    /// Re-insert a snapshot under its original id.
    pub fn restore(&mut self, record: Record) -> Result<(), StoreError> {
        let id = record.id();
        if self.records.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        self.records.insert(id, record);
        Ok(())
    }

    /// Serialize the whole table to a writer.
    pub fn write_to<W: Write>(&self, writer: W) -> csv::Result<()> {
        write_records(writer, self.records.values())
    }

    /// Persist to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::persistence(path, e))?;

        self.write_to(tmp.as_file_mut()).map_err(|e| {
            let source = match e.into_kind() {
                csv::ErrorKind::Io(io) => io,
                other => std::io::Error::other(format!("{other:?}")),
            };
            StoreError::persistence(path, source)
        })?;

        // Keep the dataset's mode; a fresh temp file is owner-only
        if let Ok(meta) = std::fs::metadata(path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| StoreError::persistence(path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::persistence(path, e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::persistence(path, e.error))?;

        log::info!("saved {} record(s) to {}", self.len(), path.display());
        Ok(())
    }
}
