use dedupe_core::{Column, DuplicateGroup, RecordId};
use dedupe_io::DatasetStore;

use crate::history::EditHistory;

/// Render-ready snapshot of the group under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    /// 1-based index of this group.
    pub index: usize,
    pub total: usize,
    pub columns: Vec<Column>,
    pub rows: Vec<ViewRow>,
}

/// One surviving member. `position` is the number `d` and `m` refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub position: usize,
    pub id: RecordId,
    pub cells: Vec<ViewCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCell {
    pub text: String,
    /// Destination of the most recent field move.
    pub highlighted: bool,
    pub link: bool,
}

impl GroupView {
    pub(crate) fn build(
        store: &DatasetStore,
        group: &DuplicateGroup,
        index: usize,
        total: usize,
        history: &EditHistory,
    ) -> Self {
        let last_move = history.last_move();
        let columns: Vec<Column> = Column::all().collect();

        let rows = group
            .members()
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let record = store.get(*id).ok()?;
                let cells = columns
                    .iter()
                    .map(|&column| {
                        let highlighted = matches!(
                            (column, last_move),
                            (Column::Field(f), Some((target, moved))) if target == *id && f == moved
                        );
                        let link = match column {
                            Column::Field(f) => record.get(f).is_url(),
                            Column::Id => false,
                        };
                        ViewCell { text: record.display(column), highlighted, link }
                    })
                    .collect();
                Some(ViewRow { position: i + 1, id: *id, cells })
            })
            .collect();

        GroupView { index, total, columns, rows }
    }

    /// Progress marker, e.g. `[3/12]`.
    pub fn progress(&self) -> String {
        format!("[{}/{}]", self.index, self.total)
    }

    pub fn row(&self, position: usize) -> Option<&ViewRow> {
        self.rows.iter().find(|r| r.position == position)
    }
}
