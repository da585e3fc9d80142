use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::{Column, Field};
use crate::value::Value;

/// Unique record identifier, stable for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RecordId)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

/// One row. The identifier cannot change once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    values: [Value; Field::COUNT],
}

/// Grouping key (name, city, state), compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey<'a> {
    pub name: &'a Value,
    pub city: &'a Value,
    pub state: &'a Value,
}

impl Record {
    /// A record with every field empty.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            values: Default::default(),
        }
    }

    /// Builder-style setter, handy for fixtures.
    pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, field: Field) -> &Value {
        &self.values[field.index()]
    }

    /// Overwrite a field, returning the previous value.
    pub fn set(&mut self, field: Field, value: Value) -> Value {
        std::mem::replace(&mut self.values[field.index()], value)
    }

    /// Display text for any column, identifier included.
    pub fn display(&self, column: Column) -> String {
        match column {
            Column::Id => self.id.to_string(),
            Column::Field(f) => self.get(f).to_string(),
        }
    }

    pub fn key(&self) -> CompositeKey<'_> {
        CompositeKey {
            name: self.get(Field::NAME),
            city: self.get(Field::CITY),
            state: self.get(Field::STATE),
        }
    }

    /// Field values in schema order.
    pub fn values(&self) -> impl Iterator<Item = (Field, &Value)> {
        Field::ALL.iter().copied().zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_previous() {
        let mut rec = Record::new(7).with(Field::Notes, "old");
        let prev = rec.set(Field::Notes, Value::from("new"));
        assert_eq!(prev, Value::from("old"));
        assert_eq!(rec.get(Field::Notes), &Value::from("new"));
        assert_eq!(rec.id(), RecordId(7));
    }

    #[test]
    fn key_is_exact() {
        let a = Record::new(1)
            .with(Field::NAME, "Archive")
            .with(Field::CITY, "Boston")
            .with(Field::STATE, "MA");
        let b = Record::new(2)
            .with(Field::NAME, "Archive")
            .with(Field::CITY, "Boston")
            .with(Field::STATE, "MA");
        let c = Record::new(3)
            .with(Field::NAME, "archive")
            .with(Field::CITY, "Boston")
            .with(Field::STATE, "MA");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn display_covers_id_column() {
        let rec = Record::new(42).with(Field::Url, "https://x.org");
        assert_eq!(rec.display(Column::Id), "42");
        assert_eq!(rec.display(Column::Field(Field::Url)), "https://x.org");
        assert_eq!(rec.display(Column::Field(Field::Notes)), "");
    }

    #[test]
    fn record_id_parses_and_serializes() {
        assert_eq!(" 12 ".parse::<RecordId>().unwrap(), RecordId(12));
        assert!("x".parse::<RecordId>().is_err());
        assert_eq!(serde_json::to_string(&RecordId(5)).unwrap(), "5");
    }
}
