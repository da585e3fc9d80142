use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, SubsecRound};
use dedupe_core::{Column, DuplicateGroup, Field, RecordId, Value};
use dedupe_io::{DatasetStore, StoreError};

use crate::command::Command;
use crate::error::{Reference, SessionError};
use crate::history::{Edit, EditHistory};
use crate::view::GroupView;

type Clock = Box<dyn Fn() -> NaiveDateTime>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Reviewing,
    Help,
    Terminal,
}

/// What a successfully applied command did, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Advanced,
    WentBack,
    Deleted(RecordId),
    Moved { field: Field, from: RecordId, to: RecordId },
    Undone(Edit),
    Saved(PathBuf),
    ShowHelp,
    Finished,
    /// Nothing to do: undo on an empty stack, previous at the first group,
    /// or input that is not a command.
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Advanced => f.write_str("next group"),
            Outcome::WentBack => f.write_str("previous group"),
            Outcome::Deleted(id) => write!(f, "deleted record {id}"),
            Outcome::Moved { field, from, to } => write!(f, "copied {field} from {from} to {to}"),
            Outcome::Undone(Edit::FieldMove { target, field, .. }) => {
                write!(f, "undid change to {field} on {target}")
            }
            Outcome::Undone(Edit::RecordDelete(record)) => {
                write!(f, "restored record {}", record.id())
            }
            Outcome::Saved(path) => write!(f, "saved to {}", path.display()),
            Outcome::ShowHelp => f.write_str("help"),
            Outcome::Finished => f.write_str("done"),
            Outcome::Unchanged => f.write_str("nothing to do"),
        }
    }
}

/// Walks the operator through each duplicate group.
///
/// The session owns the store. Edits land in the store immediately; the
/// per-group history only exists so they can be reversed until the operator
/// leaves the group.
pub struct EditSession {
    store: DatasetStore,
    groups: Vec<DuplicateGroup>,
    cursor: usize,
    state: SessionState,
    history: EditHistory,
    destination: PathBuf,
    clock: Clock,
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("groups", &self.groups.len())
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("history", &self.history.len())
            .field("destination", &self.destination)
            .finish()
    }
}

impl EditSession {
    pub fn new(store: DatasetStore, groups: Vec<DuplicateGroup>, destination: impl Into<PathBuf>) -> Self {
        let state = if groups.is_empty() {
            SessionState::Terminal
        } else {
            SessionState::Reviewing
        };
        Self {
            store,
            groups,
            cursor: 0,
            state,
            history: EditHistory::new(),
            destination: destination.into(),
            clock: Box::new(|| Local::now().naive_local().trunc_subsecs(0)),
        }
    }

    /// Replace the timestamp source used when leaving a group.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Terminal
    }

    /// 0-based cursor into the group list.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn current_group(&self) -> Option<&DuplicateGroup> {
        if self.is_finished() {
            return None;
        }
        self.groups.get(self.cursor)
    }

    /// `[i+1/N]`, or `None` once the session is over.
    pub fn progress(&self) -> Option<String> {
        self.current_group()
            .map(|_| format!("[{}/{}]", self.cursor + 1, self.groups.len()))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn into_store(self) -> DatasetStore {
        self.store
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn view(&self) -> Option<GroupView> {
        let group = self.current_group()?;
        Some(GroupView::build(
            &self.store,
            group,
            self.cursor + 1,
            self.groups.len(),
            &self.history,
        ))
    }

    /// Close the help overlay.
    pub fn dismiss_help(&mut self) {
        if self.state == SessionState::Help {
            self.state = SessionState::Reviewing;
        }
    }

    /// Parse and apply one line of operator input.
    pub fn execute(&mut self, line: &str) -> Result<Outcome, SessionError> {
        match Command::parse(line) {
            Some(cmd) => self.apply(cmd),
            None => {
                log::debug!("ignored input {:?}", line.trim());
                Ok(Outcome::Unchanged)
            }
        }
    }

    pub fn apply(&mut self, cmd: Command) -> Result<Outcome, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        self.dismiss_help();
        log::debug!("apply {:?} at group {}", cmd, self.cursor + 1);

        match cmd {
            Command::Next => Ok(self.next()),
            Command::Previous => Ok(self.previous()),
            Command::Delete(position) => self.delete(position),
            Command::Move { field, from, to } => self.move_field(field, from, to),
            Command::Undo => self.undo(),
            Command::Save => self.save(),
            Command::Quit => {
                log::info!("quit at group {} of {}", self.cursor + 1, self.groups.len());
                self.state = SessionState::Terminal;
                Ok(Outcome::Finished)
            }
            Command::Help => {
                self.state = SessionState::Help;
                Ok(Outcome::ShowHelp)
            }
        }
    }

    fn next(&mut self) -> Outcome {
        let targets = self.history.moved_targets();
        if !targets.is_empty() {
            let now = Value::from((self.clock)());
            for id in targets {
                // Deleted targets have nothing to stamp
                if self.store.set_field(id, Field::UPDATED, now.clone()).is_ok() {
                    log::debug!("stamped {} on {}", Field::UPDATED, id);
                }
            }
        }
        self.history.clear();

        self.cursor += 1;
        if self.cursor >= self.groups.len() {
            log::info!("reviewed all {} group(s)", self.groups.len());
            self.state = SessionState::Terminal;
            Outcome::Finished
        } else {
            Outcome::Advanced
        }
    }

    fn previous(&mut self) -> Outcome {
        if self.cursor == 0 {
            return Outcome::Unchanged;
        }
        self.history.clear();
        self.cursor -= 1;
        Outcome::WentBack
    }

    fn member(&self, position: usize) -> Result<RecordId, SessionError> {
        let group = self.current_group().ok_or(SessionError::Finished)?;
        group.member(position).ok_or(SessionError::InvalidReference {
            what: Reference::Record,
            position,
            max: group.len(),
        })
    }

    fn delete(&mut self, position: usize) -> Result<Outcome, SessionError> {
        let id = self.member(position)?;
        let snapshot = self.store.delete(id)?;
        self.history.push(Edit::RecordDelete(snapshot));
        log::info!("deleted record {id}");
        Ok(Outcome::Deleted(id))
    }

    fn move_field(&mut self, field: usize, from: usize, to: usize) -> Result<Outcome, SessionError> {
        let column = Column::at(field).ok_or(SessionError::InvalidReference {
            what: Reference::Field,
            position: field,
            max: Field::COUNT + 1,
        })?;
        let source = self.member(from)?;
        let target = self.member(to)?;
        let field = column.writable().map_err(StoreError::from)?;

        let value = self.store.get(source)?.get(field).clone();
        let previous = self.store.set_field(target, field, value)?;
        self.history.push(Edit::FieldMove { target, field, previous });
        log::info!("copied {field} from {source} to {target}");
        Ok(Outcome::Moved { field, from: source, to: target })
    }

    fn undo(&mut self) -> Result<Outcome, SessionError> {
        let Some(edit) = self.history.undo() else {
            return Ok(Outcome::Unchanged);
        };

        let result = match &edit {
            Edit::FieldMove { target, field, previous } => self
                .store
                .set_field(*target, *field, previous.clone())
                .map(|_| ()),
            Edit::RecordDelete(record) => self.store.restore(record.clone()),
        };

        match result {
            Ok(()) => {
                log::info!("undo on record {}", edit.record_id());
                Ok(Outcome::Undone(edit))
            }
            Err(e) => {
                self.history.reinstate(edit);
                Err(e.into())
            }
        }
    }

    fn save(&mut self) -> Result<Outcome, SessionError> {
        match self.store.save(&self.destination) {
            Ok(()) => Ok(Outcome::Saved(self.destination.clone())),
            Err(e) => {
                log::warn!("save failed: {e}");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dedupe_core::Record;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn rec(id: i64, addr: &str, notes: &str) -> Record {
        Record::new(id)
            .with(Field::NAME, "Archive")
            .with(Field::PRIMARY_ADDRESS, addr)
            .with(Field::CITY, "Boston")
            .with(Field::STATE, "MA")
            .with(Field::Notes, notes)
    }

    fn session(groups: &[&[i64]]) -> EditSession {
        let ids: Vec<i64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
        let store = DatasetStore::from_records(
            ids.iter().map(|&id| rec(id, &format!("{id} Main St"), &format!("note {id}"))),
        )
        .unwrap();
        let groups = groups
            .iter()
            .map(|g| DuplicateGroup::new(g.iter().map(|&i| RecordId(i)).collect()).unwrap())
            .collect();
        EditSession::new(store, groups, "unused.csv").with_clock(noon)
    }

    fn notes(s: &EditSession, id: i64) -> String {
        s.store().get(RecordId(id)).unwrap().get(Field::Notes).to_string()
    }

    #[test]
    fn no_groups_starts_terminal() {
        let s = EditSession::new(DatasetStore::new(), Vec::new(), "x.csv");
        assert!(s.is_finished());
        assert!(s.view().is_none());
        assert!(s.progress().is_none());
    }

    #[test]
    fn next_walks_to_terminal() {
        let mut s = session(&[&[1, 2], &[3, 4]]);
        assert_eq!(s.progress().as_deref(), Some("[1/2]"));
        assert_eq!(s.apply(Command::Next).unwrap(), Outcome::Advanced);
        assert_eq!(s.progress().as_deref(), Some("[2/2]"));
        assert_eq!(s.apply(Command::Next).unwrap(), Outcome::Finished);
        assert!(s.is_finished());
        assert!(matches!(s.apply(Command::Next), Err(SessionError::Finished)));
    }

    #[test]
    fn previous_at_first_group_is_noop() {
        let mut s = session(&[&[1, 2], &[3, 4]]);
        assert_eq!(s.apply(Command::Previous).unwrap(), Outcome::Unchanged);
        assert_eq!(s.cursor(), 0);
        s.apply(Command::Next).unwrap();
        assert_eq!(s.apply(Command::Previous).unwrap(), Outcome::WentBack);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn previous_keeps_edits_but_drops_history() {
        let mut s = session(&[&[1, 2], &[3, 4]]);
        s.apply(Command::Next).unwrap();
        s.apply(Command::Delete(1)).unwrap();
        assert!(s.can_undo());
        s.apply(Command::Previous).unwrap();
        assert!(!s.can_undo());
        assert!(!s.store().contains(RecordId(3)));
        // Previous never stamps
        assert!(s.store().records().all(|r| r.get(Field::UPDATED).is_empty()));
    }

    #[test]
    fn delete_out_of_range() {
        let mut s = session(&[&[1, 2]]);
        for pos in [0, 3, usize::MAX] {
            let err = s.apply(Command::Delete(pos)).unwrap_err();
            assert!(matches!(err, SessionError::InvalidReference { what: Reference::Record, .. }));
        }
        assert_eq!(s.store().len(), 2);
        assert!(!s.can_undo());
    }

    #[test]
    fn delete_twice_is_not_found() {
        let mut s = session(&[&[1, 2]]);
        s.apply(Command::Delete(2)).unwrap();
        let err = s.apply(Command::Delete(2)).unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::NotFound(RecordId(2)))));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn move_then_undo_restores_exact_value() {
        let mut s = session(&[&[1, 2]]);
        let notes_col = Field::Notes.index() + 2;
        let out = s
            .apply(Command::Move { field: notes_col, from: 1, to: 2 })
            .unwrap();
        assert_eq!(
            out,
            Outcome::Moved { field: Field::Notes, from: RecordId(1), to: RecordId(2) }
        );
        assert_eq!(notes(&s, 2), "note 1");
        assert_eq!(s.history().last_move(), Some((RecordId(2), Field::Notes)));

        s.apply(Command::Undo).unwrap();
        assert_eq!(notes(&s, 2), "note 2");
        assert!(!s.can_undo());
    }

    #[test]
    fn move_rejects_bad_references_without_side_effects() {
        let mut s = session(&[&[1, 2]]);
        let before = s.store().clone();

        let err = s.apply(Command::Move { field: 27, from: 1, to: 2 }).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { what: Reference::Field, max: 26, .. }));
        let err = s.apply(Command::Move { field: 0, from: 1, to: 2 }).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { what: Reference::Field, .. }));
        let err = s.apply(Command::Move { field: 3, from: 1, to: 5 }).unwrap_err();
        assert!(matches!(err, SessionError::InvalidReference { what: Reference::Record, .. }));
        // Column 1 is the id
        let err = s.apply(Command::Move { field: 1, from: 1, to: 2 }).unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::UnknownField(_))));

        s.apply(Command::Delete(1)).unwrap();
        let err = s.apply(Command::Move { field: 3, from: 1, to: 2 }).unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::NotFound(RecordId(1)))));

        assert_eq!(s.history().len(), 1);
        s.apply(Command::Undo).unwrap();
        assert_eq!(s.store(), &before);
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut s = session(&[&[1, 2]]);
        let before = s.store().clone();
        assert_eq!(s.apply(Command::Undo).unwrap(), Outcome::Unchanged);
        assert_eq!(s.store(), &before);
    }

    #[test]
    fn undo_unwinds_in_reverse() {
        let mut s = session(&[&[1, 2, 3]]);
        let before = s.store().clone();
        let notes_col = Field::Notes.index() + 2;
        s.apply(Command::Move { field: notes_col, from: 1, to: 2 }).unwrap();
        s.apply(Command::Move { field: notes_col, from: 3, to: 2 }).unwrap();
        s.apply(Command::Delete(2)).unwrap();
        assert_eq!(s.history().len(), 3);
        for _ in 0..3 {
            s.apply(Command::Undo).unwrap();
        }
        assert_eq!(s.store(), &before);
    }

    #[test]
    fn next_stamps_surviving_move_targets_only() {
        let mut s = session(&[&[1, 2, 3], &[4, 5]]);
        let notes_col = Field::Notes.index() + 2;
        s.apply(Command::Move { field: notes_col, from: 1, to: 2 }).unwrap();
        s.apply(Command::Move { field: notes_col, from: 1, to: 3 }).unwrap();
        s.apply(Command::Delete(3)).unwrap();
        s.apply(Command::Next).unwrap();

        let updated = |id| s.store().get(RecordId(id)).unwrap().get(Field::UPDATED).clone();
        assert_eq!(updated(2), Value::from(noon()));
        assert_eq!(updated(1), Value::Empty);
        assert!(!s.store().contains(RecordId(3)));
        assert!(!s.can_undo());
    }

    #[test]
    fn next_without_moves_stamps_nothing() {
        let mut s = session(&[&[1, 2], &[3, 4]]);
        s.apply(Command::Delete(2)).unwrap();
        s.apply(Command::Next).unwrap();
        assert!(s.store().records().all(|r| r.get(Field::UPDATED).is_empty()));
    }

    #[test]
    fn undone_move_is_not_stamped() {
        let mut s = session(&[&[1, 2], &[3, 4]]);
        let notes_col = Field::Notes.index() + 2;
        s.apply(Command::Move { field: notes_col, from: 1, to: 2 }).unwrap();
        s.apply(Command::Undo).unwrap();
        s.apply(Command::Next).unwrap();
        assert!(s.store().get(RecordId(2)).unwrap().get(Field::UPDATED).is_empty());
    }

    #[test]
    fn help_is_transient() {
        let mut s = session(&[&[1, 2]]);
        assert_eq!(s.apply(Command::Help).unwrap(), Outcome::ShowHelp);
        assert_eq!(s.state(), SessionState::Help);
        s.dismiss_help();
        assert_eq!(s.state(), SessionState::Reviewing);

        s.apply(Command::Help).unwrap();
        s.apply(Command::Undo).unwrap();
        assert_eq!(s.state(), SessionState::Reviewing);
    }

    #[test]
    fn quit_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut s = session(&[&[1, 2]]);
        s.destination = out.clone();
        s.apply(Command::Delete(1)).unwrap();
        assert_eq!(s.apply(Command::Quit).unwrap(), Outcome::Finished);
        assert!(s.is_finished());
        assert!(!out.exists());
    }

    #[test]
    fn save_failure_keeps_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(&[&[1, 2]]);
        s.destination = dir.path().join("missing").join("out.csv");
        s.apply(Command::Delete(1)).unwrap();
        let err = s.apply(Command::Save).unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Persistence { .. })));
        assert!(!err.is_fatal());
        assert!(s.can_undo());
        assert_eq!(s.state(), SessionState::Reviewing);
    }

    #[test]
    fn execute_ignores_garbage() {
        let mut s = session(&[&[1, 2]]);
        assert_eq!(s.execute("bogus").unwrap(), Outcome::Unchanged);
        assert_eq!(s.execute("d 1").unwrap(), Outcome::Deleted(RecordId(1)));
    }

    #[test]
    fn view_skips_deleted_and_keeps_positions() {
        let mut s = session(&[&[1, 2, 3]]);
        s.apply(Command::Delete(2)).unwrap();
        let view = s.view().unwrap();
        let positions: Vec<_> = view.rows.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 3]);
        assert_eq!(view.row(3).unwrap().id, RecordId(3));
        assert_eq!(view.progress(), "[1/1]");
        assert_eq!(view.columns.len(), Field::COUNT + 1);
    }

    #[test]
    fn view_highlights_last_move_only() {
        let mut s = session(&[&[1, 2]]);
        let notes_col = Field::Notes.index() + 2;
        s.apply(Command::Move { field: notes_col, from: 1, to: 2 }).unwrap();
        let view = s.view().unwrap();
        let hits: Vec<_> = view
            .rows
            .iter()
            .flat_map(|r| {
                r.cells
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.highlighted)
                    .map(move |(col, _)| (r.position, col + 1))
            })
            .collect();
        assert_eq!(hits, vec![(2, notes_col)]);

        s.apply(Command::Delete(1)).unwrap();
        let view = s.view().unwrap();
        assert!(view.rows.iter().all(|r| r.cells.iter().all(|c| !c.highlighted)));
    }

    #[test]
    fn view_marks_links() {
        let store = DatasetStore::from_records(vec![
            rec(1, "a", "").with(Field::Url, "https://example.org"),
            rec(2, "a", "").with(Field::Url, "example.org"),
        ])
        .unwrap();
        let groups = vec![DuplicateGroup::new(vec![RecordId(1), RecordId(2)]).unwrap()];
        let s = EditSession::new(store, groups, "x.csv");
        let view = s.view().unwrap();
        let url_col = Field::Url.index() + 1;
        assert!(view.rows[0].cells[url_col].link);
        assert!(!view.rows[1].cells[url_col].link);
        assert!(!view.rows[0].cells[0].link);
    }
}
