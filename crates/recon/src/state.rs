//! Row lifecycle.
//!
//! One tagged state per row. "New" and "Editing" are not independent flags:
//! a never-saved row is [`RowState::Draft`] (new and editing at once), and a
//! committed row under edit is [`RowState::Editing`] carrying the snapshot
//! that Cancel reverts to. New+Deleted has no variant.
//!
//! | op      | Draft        | Committed      | Editing              | Deleted   |
//! |---------|--------------|----------------|----------------------|-----------|
//! | edit    | –            | Editing        | –                    | error     |
//! | save    | Committed*   | –              | Committed*           | –         |
//! | cancel  | removed      | –              | Committed (snapshot) | –         |
//! | delete  | removed      | Deleted        | Deleted (snapshot)   | –         |
//! | restore | –            | –              | –                    | Committed |
//!
//! `*` only when the fields validate; otherwise the row stays as it was.
//! `–` is a no-op.

use crate::error::{ReconError, ValidationError};
use crate::model::RevisedFields;
use crate::store::RowId;

#[derive(Debug, Clone, PartialEq)]
pub enum RowState<T> {
    /// Created by Add and never saved. Editable; has no origin key.
    Draft,
    Committed,
    /// Under edit; `snapshot` holds the last committed field values.
    Editing { snapshot: T },
    /// Tombstoned. Fields hold the last committed values.
    Deleted,
}

impl<T> RowState<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Committed => "committed",
            Self::Editing { .. } => "editing",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Draft)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Draft | Self::Editing { .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Edit,
    Save,
    Cancel,
    Delete,
    Restore,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Save => "save",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }
}

/// What a transition did. The store acts on `Remove`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Changed,
    Unchanged,
    Remove,
    Rejected(ValidationError),
}

/// Apply `op` to a row's state and fields.
///
/// On `Err` and on `Rejected` neither `state` nor `fields` is modified.
pub fn transition<T: RevisedFields>(
    row: RowId,
    state: &mut RowState<T>,
    fields: &mut T,
    op: Op,
) -> Result<Effect, ReconError> {
    let invalid = |state: &RowState<T>| ReconError::InvalidTransition {
        row,
        state: state.name(),
        op: op.name(),
    };

    match op {
        Op::Edit => match state {
            RowState::Committed => {
                *state = RowState::Editing { snapshot: fields.clone() };
                Ok(Effect::Changed)
            }
            RowState::Draft | RowState::Editing { .. } => Ok(Effect::Unchanged),
            RowState::Deleted => Err(invalid(state)),
        },

        Op::Save => {
            if !state.is_editing() {
                return Ok(Effect::Unchanged);
            }
            match fields.validate() {
                Ok(()) => {
                    *state = RowState::Committed;
                    Ok(Effect::Changed)
                }
                Err(e) => Ok(Effect::Rejected(e)),
            }
        }

        Op::Cancel => match std::mem::replace(state, RowState::Committed) {
            RowState::Draft => {
                *state = RowState::Draft;
                Ok(Effect::Remove)
            }
            RowState::Editing { snapshot } => {
                *fields = snapshot;
                Ok(Effect::Changed)
            }
            other => {
                *state = other;
                Ok(Effect::Unchanged)
            }
        },

        Op::Delete => match std::mem::replace(state, RowState::Deleted) {
            RowState::Draft => {
                *state = RowState::Draft;
                Ok(Effect::Remove)
            }
            RowState::Editing { snapshot } => {
                // Leaving Editing discards uncommitted edits.
                *fields = snapshot;
                Ok(Effect::Changed)
            }
            RowState::Committed => Ok(Effect::Changed),
            RowState::Deleted => Ok(Effect::Unchanged),
        },

        Op::Restore => match state {
            RowState::Deleted => {
                *state = RowState::Committed;
                Ok(Effect::Changed)
            }
            _ => Ok(Effect::Unchanged),
        },
    }
}
