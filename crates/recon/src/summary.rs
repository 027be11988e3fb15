use serde::Serialize;

use crate::identity::OriginKey;
use crate::model::RevisedFields;
use crate::state::RowState;
use crate::store::{RevisionStore, RowId};
use crate::totals::DisplacementTotals;

/// Where an original stands against the revised set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "row", rename_all = "snake_case")]
pub enum OriginStatus {
    Pending,
    Accepted(RowId),
    /// Accepted, then deleted by the reviewer. Blocks re-acceptance.
    AcceptedDeleted(RowId),
}

impl std::fmt::Display for OriginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted(row) => write!(f, "accepted ({row})"),
            Self::AcceptedDeleted(row) => write!(f, "accepted, deleted ({row})"),
        }
    }
}

pub fn origin_status<T: RevisedFields>(store: &RevisionStore<T>, key: &OriginKey) -> OriginStatus {
    match store.row_for_origin(key).and_then(|id| store.get(id)) {
        None => OriginStatus::Pending,
        Some(row) if row.is_deleted() => OriginStatus::AcceptedDeleted(row.id()),
        Some(row) => OriginStatus::Accepted(row.id()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub originals: usize,
    pub pending: usize,
    pub accepted: usize,
    pub accepted_deleted: usize,
    /// Non-deleted rows, drafts included.
    pub live_rows: usize,
    pub deleted_rows: usize,
    pub drafts: usize,
    /// Committed rows currently under edit.
    pub editing: usize,
    /// Saved rows with no origin.
    pub net_new: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub displacements: CollectionSummary,
    pub parts: CollectionSummary,
    pub displacement_totals: DisplacementTotals,
    pub parts_total_cents: i64,
}

impl ReconSummary {
    /// Originals not yet reflected in the revised set.
    pub fn pending(&self) -> usize {
        self.displacements.pending + self.parts.pending
    }

    pub fn drafts(&self) -> usize {
        self.displacements.drafts + self.parts.drafts
    }
}

/// Count one collection. `keys` are the origin keys of its originals, one
/// per original (shared fallback keys appear more than once).
pub fn summarize_collection<'a, T: RevisedFields>(
    keys: impl IntoIterator<Item = &'a OriginKey>,
    store: &RevisionStore<T>,
) -> CollectionSummary {
    let mut s = CollectionSummary::default();

    for key in keys {
        s.originals += 1;
        match origin_status(store, key) {
            OriginStatus::Pending => s.pending += 1,
            OriginStatus::Accepted(_) => s.accepted += 1,
            OriginStatus::AcceptedDeleted(_) => s.accepted_deleted += 1,
        }
    }

    for row in store.iter() {
        match row.state() {
            RowState::Deleted => s.deleted_rows += 1,
            RowState::Draft => {
                s.live_rows += 1;
                s.drafts += 1;
            }
            RowState::Editing { .. } => {
                s.live_rows += 1;
                s.editing += 1;
                if row.origin().is_none() {
                    s.net_new += 1;
                }
            }
            RowState::Committed => {
                s.live_rows += 1;
                if row.origin().is_none() {
                    s.net_new += 1;
                }
            }
        }
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartFields;

    #[test]
    fn status_and_counts() {
        let keys: Vec<OriginKey> = ["id:1", "id:2", "fat:3:tape:1", "fat:3:tape:1"]
            .into_iter()
            .map(OriginKey::from)
            .collect();

        let mut store = RevisionStore::new();
        let a = store.accept(keys[0].clone(), PartFields::default()).row();
        let b = store.accept(keys[2].clone(), PartFields::default()).row();
        store.delete(b).unwrap();
        store.add(PartFields::default());

        assert_eq!(origin_status(&store, &keys[0]), OriginStatus::Accepted(a));
        assert_eq!(origin_status(&store, &keys[1]), OriginStatus::Pending);
        assert_eq!(origin_status(&store, &keys[3]), OriginStatus::AcceptedDeleted(b));

        let s = summarize_collection(&keys, &store);
        assert_eq!(s.originals, 4);
        assert_eq!(s.accepted, 1);
        assert_eq!(s.pending, 1);
        // shared fallback key counts for both originals
        assert_eq!(s.accepted_deleted, 2);
        assert_eq!(s.live_rows, 2);
        assert_eq!(s.deleted_rows, 1);
        assert_eq!(s.drafts, 1);
        assert_eq!(s.net_new, 0);
    }

    #[test]
    fn status_serializes_tagged() {
        let json = serde_json::to_value(OriginStatus::Accepted(RowId::from_raw(3))).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "accepted", "row": 3 }));
        let json = serde_json::to_value(OriginStatus::Pending).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "pending" }));
    }
}
