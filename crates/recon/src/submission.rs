use fieldrev_core::ServiceOrderId;
use serde::Serialize;

use crate::identity::OriginKey;
use crate::model::{DisplacementFields, PartFields, RevisedFields};
use crate::state::RowState;
use crate::store::{RevisionStore, RowId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedRow<T> {
    pub row_id: RowId,
    pub origin: Option<OriginKey>,
    #[serde(flatten)]
    pub fields: T,
}

/// Final record set for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionPayload<T> {
    /// Live rows accepted from an original.
    pub committed_rows: Vec<SubmittedRow<T>>,
    /// Origin keys whose accepted row was deleted by the reviewer.
    pub deleted_origin_keys: Vec<OriginKey>,
    /// Live rows added by the reviewer (no origin).
    pub new_rows: Vec<SubmittedRow<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub order_id: Option<ServiceOrderId>,
    pub engine_version: String,
    pub generated_at: String,
    /// Never-saved drafts left out of the payload.
    pub unsaved_drafts: usize,
    pub displacements: CollectionPayload<DisplacementFields>,
    pub parts: CollectionPayload<PartFields>,
}

/// Receives the final payload. Durable storage and wire format belong to
/// the implementation.
pub trait SubmissionSink {
    type Error;

    fn submit(&mut self, payload: &SubmissionPayload) -> Result<(), Self::Error>;
}

/// Build one collection's payload. Rows under edit contribute their last
/// committed values. Returns the payload and the number of skipped drafts.
pub fn collect_payload<T: RevisedFields>(store: &RevisionStore<T>) -> (CollectionPayload<T>, usize) {
    let mut payload = CollectionPayload {
        committed_rows: Vec::new(),
        deleted_origin_keys: Vec::new(),
        new_rows: Vec::new(),
    };
    let mut drafts = 0;

    for row in store.iter() {
        if matches!(row.state(), RowState::Deleted) {
            if let Some(origin) = row.origin() {
                payload.deleted_origin_keys.push(origin.clone());
            }
            continue;
        }

        let Some(fields) = row.committed_fields() else {
            drafts += 1;
            continue;
        };

        let submitted = SubmittedRow {
            row_id: row.id(),
            origin: row.origin().cloned(),
            fields: fields.clone(),
        };
        match row.origin() {
            Some(_) => payload.committed_rows.push(submitted),
            None => payload.new_rows.push(submitted),
        }
    }

    (payload, drafts)
}

pub fn build_payload(
    order_id: Option<ServiceOrderId>,
    displacements: &RevisionStore<DisplacementFields>,
    parts: &RevisionStore<PartFields>,
) -> SubmissionPayload {
    let (displacements, displacement_drafts) = collect_payload(displacements);
    let (parts, part_drafts) = collect_payload(parts);

    SubmissionPayload {
        order_id,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        unsaved_drafts: displacement_drafts + part_drafts,
        displacements,
        parts,
    }
}
