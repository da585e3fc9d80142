use serde::Serialize;

use crate::record::RecordId;

/// Ids sharing one composite key. Sorted ascending, at least two members.
///
/// A group is fixed once computed: deleting a member from the dataset does
/// not remove it here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DuplicateGroup {
    members: Vec<RecordId>,
}

impl DuplicateGroup {
    /// Returns `None` for fewer than two ids.
    pub fn new(mut members: Vec<RecordId>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        members.sort_unstable();
        Some(Self { members })
    }

    pub fn members(&self) -> &[RecordId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Smallest id; groups are ordered by it.
    pub fn first(&self) -> RecordId {
        self.members[0]
    }

    /// Member at a 1-based position, as the operator numbers them.
    pub fn member(&self, position: usize) -> Option<RecordId> {
        position
            .checked_sub(1)
            .and_then(|i| self.members.get(i))
            .copied()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}
