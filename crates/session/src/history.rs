//! Undo history for the active group

use std::collections::BTreeSet;

use dedupe_core::{Field, Record, RecordId, Value};

/// One reversible mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    /// `field` on `target` was overwritten; `previous` is what it held.
    FieldMove {
        target: RecordId,
        field: Field,
        previous: Value,
    },
    /// The record was removed; this is its full snapshot.
    RecordDelete(Record),
}

impl Edit {
    pub fn record_id(&self) -> RecordId {
        match self {
            Edit::FieldMove { target, .. } => *target,
            Edit::RecordDelete(record) => record.id(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EditHistory {
    undo_stack: Vec<Edit>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.undo_stack.push(edit);
    }

    /// Pop the last entry for undo
    pub fn undo(&mut self) -> Option<Edit> {
        self.undo_stack.pop()
    }

    /// Put an entry back after a failed undo.
    pub(crate) fn reinstate(&mut self, edit: Edit) {
        self.undo_stack.push(edit);
    }

    pub fn last(&self) -> Option<&Edit> {
        self.undo_stack.last()
    }

    /// Target cell of the most recent edit, if it was a field move.
    pub fn last_move(&self) -> Option<(RecordId, Field)> {
        match self.last()? {
            Edit::FieldMove { target, field, .. } => Some((*target, *field)),
            Edit::RecordDelete(_) => None,
        }
    }

    /// Records overwritten by field moves still on the stack.
    pub fn moved_targets(&self) -> BTreeSet<RecordId> {
        self.undo_stack
            .iter()
            .filter_map(|e| match e {
                Edit::FieldMove { target, .. } => Some(*target),
                Edit::RecordDelete(_) => None,
            })
            .collect()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(id: i64, field: Field) -> Edit {
        Edit::FieldMove {
            target: RecordId(id),
            field,
            previous: Value::Empty,
        }
    }

    #[test]
    fn lifo_order() {
        let mut h = EditHistory::new();
        h.push(mv(1, Field::Notes));
        h.push(Edit::RecordDelete(Record::new(2)));
        assert_eq!(h.undo().map(|e| e.record_id()), Some(RecordId(2)));
        assert_eq!(h.undo().map(|e| e.record_id()), Some(RecordId(1)));
        assert!(h.undo().is_none());
    }

    #[test]
    fn last_move_ignores_deletes() {
        let mut h = EditHistory::new();
        assert_eq!(h.last_move(), None);
        h.push(mv(1, Field::Url));
        assert_eq!(h.last_move(), Some((RecordId(1), Field::Url)));
        h.push(Edit::RecordDelete(Record::new(2)));
        assert_eq!(h.last_move(), None);
    }

    #[test]
    fn moved_targets_dedupes() {
        let mut h = EditHistory::new();
        h.push(mv(3, Field::Url));
        h.push(mv(3, Field::Notes));
        h.push(mv(1, Field::Notes));
        h.push(Edit::RecordDelete(Record::new(9)));
        let targets: Vec<_> = h.moved_targets().into_iter().collect();
        assert_eq!(targets, vec![RecordId(1), RecordId(3)]);
        h.clear();
        assert!(!h.can_undo());
    }
}
