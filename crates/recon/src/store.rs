//! Revision store: ordered arena of revised rows with tombstones.
//!
//! Rows are addressed by [`RowId`], never by position. Deleted rows stay in
//! place; only never-saved drafts are physically removed (on cancel/delete).
//! Filtering to live rows happens at the edges (`live()`, submission).

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{ReconError, ValidationError};
use crate::identity::OriginKey;
use crate::model::RevisedFields;
use crate::state::{transition, Effect, Op, RowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevisedRow<T> {
    id: RowId,
    origin: Option<OriginKey>,
    fields: T,
    state: RowState<T>,
}

impl<T> RevisedRow<T> {
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn origin(&self) -> Option<&OriginKey> {
        self.origin.as_ref()
    }

    /// Current values, including uncommitted edits.
    pub fn fields(&self) -> &T {
        &self.fields
    }

    /// Last committed values. `None` for a draft that was never saved.
    pub fn committed_fields(&self) -> Option<&T> {
        match &self.state {
            RowState::Draft => None,
            RowState::Editing { snapshot } => Some(snapshot),
            RowState::Committed | RowState::Deleted => Some(&self.fields),
        }
    }

    pub fn state(&self) -> &RowState<T> {
        &self.state
    }

    pub fn is_deleted(&self) -> bool {
        self.state.is_deleted()
    }

    pub fn is_editing(&self) -> bool {
        self.state.is_editing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Inserted(RowId),
    /// Origin key already has a row (possibly deleted). Not an error.
    AlreadyPresent(RowId),
}

impl AcceptOutcome {
    pub fn row(&self) -> RowId {
        match self {
            Self::Inserted(id) | Self::AlreadyPresent(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Invalid(ValidationError),
    NotEditing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Reverted,
    Removed,
    NotEditing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Tombstoned,
    Removed,
    AlreadyDeleted,
}

#[derive(Debug, Clone)]
pub struct RevisionStore<T> {
    rows: Vec<RevisedRow<T>>,
    by_origin: HashMap<OriginKey, RowId>,
    next_id: u64,
}

impl<T> Default for RevisionStore<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            by_origin: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T: RevisedFields> RevisionStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in insertion order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = &RevisedRow<T>> {
        self.rows.iter()
    }

    pub fn live(&self) -> impl Iterator<Item = &RevisedRow<T>> {
        self.rows.iter().filter(|r| !r.is_deleted())
    }

    pub fn deleted(&self) -> impl Iterator<Item = &RevisedRow<T>> {
        self.rows.iter().filter(|r| r.is_deleted())
    }

    pub fn get(&self, id: RowId) -> Option<&RevisedRow<T>> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn require(&self, id: RowId) -> Result<&RevisedRow<T>, ReconError> {
        self.get(id).ok_or(ReconError::UnknownRow(id))
    }

    /// True if any row, deleted or not, was accepted from `origin`.
    pub fn contains_origin(&self, origin: &OriginKey) -> bool {
        self.by_origin.contains_key(origin)
    }

    pub fn row_for_origin(&self, origin: &OriginKey) -> Option<RowId> {
        self.by_origin.get(origin).copied()
    }

    /// Insert a committed copy of an original unless its origin key is
    /// already present anywhere in the store.
    pub fn accept(&mut self, origin: OriginKey, fields: T) -> AcceptOutcome {
        if let Some(existing) = self.by_origin.get(&origin) {
            return AcceptOutcome::AlreadyPresent(*existing);
        }
        let id = self.issue_id();
        log::debug!("accept {origin} as {id}");
        self.by_origin.insert(origin.clone(), id);
        self.rows.push(RevisedRow {
            id,
            origin: Some(origin),
            fields,
            state: RowState::Committed,
        });
        AcceptOutcome::Inserted(id)
    }

    /// Append a blank draft row.
    pub fn add(&mut self, fields: T) -> RowId {
        let id = self.issue_id();
        log::debug!("add draft {id}");
        self.rows.push(RevisedRow {
            id,
            origin: None,
            fields,
            state: RowState::Draft,
        });
        id
    }

    pub fn edit(&mut self, id: RowId) -> Result<(), ReconError> {
        self.apply(id, Op::Edit).map(|_| ())
    }

    pub fn save(&mut self, id: RowId) -> Result<SaveOutcome, ReconError> {
        Ok(match self.apply(id, Op::Save)? {
            Effect::Changed => SaveOutcome::Saved,
            Effect::Rejected(e) => SaveOutcome::Invalid(e),
            Effect::Unchanged | Effect::Remove => SaveOutcome::NotEditing,
        })
    }

    pub fn cancel(&mut self, id: RowId) -> Result<CancelOutcome, ReconError> {
        Ok(match self.apply(id, Op::Cancel)? {
            Effect::Remove => CancelOutcome::Removed,
            Effect::Changed => CancelOutcome::Reverted,
            Effect::Unchanged | Effect::Rejected(_) => CancelOutcome::NotEditing,
        })
    }

    pub fn delete(&mut self, id: RowId) -> Result<DeleteOutcome, ReconError> {
        Ok(match self.apply(id, Op::Delete)? {
            Effect::Remove => DeleteOutcome::Removed,
            Effect::Changed => DeleteOutcome::Tombstoned,
            Effect::Unchanged | Effect::Rejected(_) => DeleteOutcome::AlreadyDeleted,
        })
    }

    /// Returns `false` if the row was not deleted.
    pub fn restore(&mut self, id: RowId) -> Result<bool, ReconError> {
        Ok(self.apply(id, Op::Restore)? == Effect::Changed)
    }

    /// Mutable access to a row's fields. Only rows being edited are writable.
    pub fn fields_mut(&mut self, id: RowId) -> Result<&mut T, ReconError> {
        let row = self.row_mut(id)?;
        if !row.state.is_editing() {
            return Err(ReconError::NotEditing(id));
        }
        Ok(&mut row.fields)
    }

    fn apply(&mut self, id: RowId, op: Op) -> Result<Effect, ReconError> {
        let pos = self.position(id)?;
        let row = &mut self.rows[pos];
        let effect = transition(id, &mut row.state, &mut row.fields, op)?;
        if effect != Effect::Unchanged {
            log::debug!("{} {id}: now {}", op.name(), row.state.name());
        }
        if effect == Effect::Remove {
            // Drafts carry no origin, so `by_origin` is untouched.
            self.rows.remove(pos);
        }
        Ok(effect)
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut RevisedRow<T>, ReconError> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ReconError::UnknownRow(id))
    }

    fn position(&self, id: RowId) -> Result<usize, ReconError> {
        self.rows
            .iter()
            .position(|r| r.id == id)
            .ok_or(ReconError::UnknownRow(id))
    }

    fn issue_id(&mut self) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        id
    }
}
