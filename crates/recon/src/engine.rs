use std::time::Instant;

use fieldrev_core::{
    CatalogPart, OriginalDisplacement, OriginalPart, ServiceOrderId, VisitReport,
};

use crate::aggregate::{flatten_visit_reports, group_by_visit_report, VisitGroup};
use crate::config::ReconConfig;
use crate::error::{LookupError, ReconError};
use crate::identity::{resolve_all, Identified, IdentityFacts, OriginKey};
use crate::lookup::{
    perform, CatalogLookupService, LookupAdvisory, LookupBook, LookupMode, LookupOutcome,
    LookupReply, LookupTicket, PartLookupState,
};
use crate::model::{Collection, DisplacementFields, PartFields};
use crate::source::VisitReportSource;
use crate::store::{AcceptOutcome, CancelOutcome, DeleteOutcome, RevisionStore, RowId, SaveOutcome};
use crate::submission::{build_payload, SubmissionPayload, SubmissionSink};
use crate::summary::{origin_status, summarize_collection, OriginStatus, ReconSummary};
use crate::totals::{displacement_totals, parts_total_cents, DisplacementTotals};

/// An original record paired with the origin key it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalEntry<T> {
    pub record: T,
    pub origin: OriginKey,
}

impl<T: Identified> Identified for OriginalEntry<T> {
    fn identity_facts(&self) -> IdentityFacts<'_> {
        self.record.identity_facts()
    }
}

/// Rows inserted by one accept-all pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptAllReport {
    pub displacements: Vec<RowId>,
    pub parts: Vec<RowId>,
}

impl AcceptAllReport {
    pub fn inserted(&self) -> usize {
        self.displacements.len() + self.parts.len()
    }
}

/// One service order under review: the read-only originals on one side and
/// the reviewer's revised sets on the other.
#[derive(Debug)]
pub struct Reconciler {
    config: ReconConfig,
    order_id: Option<ServiceOrderId>,
    displacement_originals: Vec<OriginalEntry<OriginalDisplacement>>,
    part_originals: Vec<OriginalEntry<OriginalPart>>,
    displacements: RevisionStore<DisplacementFields>,
    parts: RevisionStore<PartFields>,
    lookups: LookupBook,
}

fn pair<T>(records: Vec<T>, keys: Vec<OriginKey>) -> Vec<OriginalEntry<T>> {
    records
        .into_iter()
        .zip(keys)
        .map(|(record, origin)| OriginalEntry { record, origin })
        .collect()
}

impl Reconciler {
    pub fn new(config: ReconConfig, reports: &[VisitReport]) -> Self {
        let flat = flatten_visit_reports(reports);
        let mode = config.identity.fallback;
        let displacement_keys = resolve_all(&flat.displacements, mode);
        let part_keys = resolve_all(&flat.parts, mode);

        log::debug!(
            "aggregated {} visit reports: {} displacements, {} parts",
            reports.len(),
            flat.displacements.len(),
            flat.parts.len()
        );

        Self {
            config,
            order_id: None,
            displacement_originals: pair(flat.displacements, displacement_keys),
            part_originals: pair(flat.parts, part_keys),
            displacements: RevisionStore::new(),
            parts: RevisionStore::new(),
            lookups: LookupBook::default(),
        }
    }

    /// Load every visit report of `order_id` from `source`.
    pub fn load(
        source: &dyn VisitReportSource,
        order_id: ServiceOrderId,
        config: ReconConfig,
    ) -> Result<Self, ReconError> {
        let reports = source.visit_reports(order_id)?;
        let mut recon = Self::new(config, &reports);
        recon.order_id = Some(order_id);
        Ok(recon)
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn order_id(&self) -> Option<ServiceOrderId> {
        self.order_id
    }

    pub fn displacement_originals(&self) -> &[OriginalEntry<OriginalDisplacement>] {
        &self.displacement_originals
    }

    pub fn part_originals(&self) -> &[OriginalEntry<OriginalPart>] {
        &self.part_originals
    }

    pub fn displacements(&self) -> &RevisionStore<DisplacementFields> {
        &self.displacements
    }

    pub fn parts(&self) -> &RevisionStore<PartFields> {
        &self.parts
    }

    /// Original part indices grouped by visit report, in report order.
    pub fn part_groups(&self) -> Vec<VisitGroup> {
        group_by_visit_report(&self.part_originals)
    }

    pub fn displacement_groups(&self) -> Vec<VisitGroup> {
        group_by_visit_report(&self.displacement_originals)
    }

    // -----------------------------------------------------------------------
    // Accept
    // -----------------------------------------------------------------------

    pub fn accept_displacement(&mut self, index: usize) -> Result<AcceptOutcome, ReconError> {
        let entry = self.displacement_originals.get(index).ok_or(ReconError::UnknownOriginal {
            collection: Collection::Displacements,
            index,
        })?;
        Ok(self
            .displacements
            .accept(entry.origin.clone(), DisplacementFields::from(&entry.record)))
    }

    pub fn accept_part(&mut self, index: usize) -> Result<AcceptOutcome, ReconError> {
        let entry = self.part_originals.get(index).ok_or(ReconError::UnknownOriginal {
            collection: Collection::Parts,
            index,
        })?;
        Ok(self.parts.accept(entry.origin.clone(), PartFields::from(&entry.record)))
    }

    /// Accept every displacement whose origin key is not yet present.
    /// Deleted rows still hold their key and are not resurrected.
    pub fn accept_all_displacements(&mut self) -> Vec<RowId> {
        let mut inserted = Vec::new();
        for entry in &self.displacement_originals {
            let fields = DisplacementFields::from(&entry.record);
            if let AcceptOutcome::Inserted(id) = self.displacements.accept(entry.origin.clone(), fields) {
                inserted.push(id);
            }
        }
        inserted
    }

    pub fn accept_all_parts(&mut self) -> Vec<RowId> {
        let mut inserted = Vec::new();
        for entry in &self.part_originals {
            let fields = PartFields::from(&entry.record);
            if let AcceptOutcome::Inserted(id) = self.parts.accept(entry.origin.clone(), fields) {
                inserted.push(id);
            }
        }
        inserted
    }

    pub fn accept_all(&mut self) -> AcceptAllReport {
        let report = AcceptAllReport {
            displacements: self.accept_all_displacements(),
            parts: self.accept_all_parts(),
        };
        log::info!("accept all: {} rows inserted", report.inserted());
        report
    }

    pub fn displacement_status(&self, index: usize) -> Result<OriginStatus, ReconError> {
        let entry = self.displacement_originals.get(index).ok_or(ReconError::UnknownOriginal {
            collection: Collection::Displacements,
            index,
        })?;
        Ok(origin_status(&self.displacements, &entry.origin))
    }

    pub fn part_status(&self, index: usize) -> Result<OriginStatus, ReconError> {
        let entry = self.part_originals.get(index).ok_or(ReconError::UnknownOriginal {
            collection: Collection::Parts,
            index,
        })?;
        Ok(origin_status(&self.parts, &entry.origin))
    }

    // -----------------------------------------------------------------------
    // Displacement rows
    // -----------------------------------------------------------------------

    /// New blank row, open for editing.
    pub fn add_displacement(&mut self) -> RowId {
        self.displacements.add(DisplacementFields::default())
    }

    pub fn edit_displacement(&mut self, row: RowId) -> Result<(), ReconError> {
        self.displacements.edit(row)
    }

    /// Change working values of a row under edit.
    pub fn update_displacement<F>(&mut self, row: RowId, update: F) -> Result<(), ReconError>
    where
        F: FnOnce(&mut DisplacementFields),
    {
        update(self.displacements.fields_mut(row)?);
        Ok(())
    }

    pub fn save_displacement(&mut self, row: RowId) -> Result<SaveOutcome, ReconError> {
        self.displacements.save(row)
    }

    pub fn cancel_displacement(&mut self, row: RowId) -> Result<CancelOutcome, ReconError> {
        self.displacements.cancel(row)
    }

    pub fn delete_displacement(&mut self, row: RowId) -> Result<DeleteOutcome, ReconError> {
        self.displacements.delete(row)
    }

    pub fn restore_displacement(&mut self, row: RowId) -> Result<bool, ReconError> {
        self.displacements.restore(row)
    }

    // -----------------------------------------------------------------------
    // Part rows
    // -----------------------------------------------------------------------

    pub fn add_part(&mut self) -> RowId {
        self.parts.add(PartFields::default())
    }

    pub fn edit_part(&mut self, row: RowId) -> Result<(), ReconError> {
        self.parts.edit(row)
    }

    pub fn save_part(&mut self, row: RowId) -> Result<SaveOutcome, ReconError> {
        let outcome = self.parts.save(row)?;
        if outcome == SaveOutcome::Saved {
            self.lookups.forget(row);
        }
        Ok(outcome)
    }

    pub fn cancel_part(&mut self, row: RowId) -> Result<CancelOutcome, ReconError> {
        let outcome = self.parts.cancel(row)?;
        if outcome != CancelOutcome::NotEditing {
            self.lookups.forget(row);
        }
        Ok(outcome)
    }

    pub fn delete_part(&mut self, row: RowId) -> Result<DeleteOutcome, ReconError> {
        let outcome = self.parts.delete(row)?;
        self.lookups.forget(row);
        Ok(outcome)
    }

    pub fn restore_part(&mut self, row: RowId) -> Result<bool, ReconError> {
        self.parts.restore(row)
    }

    /// Retyping the code breaks the catalog link; the unit becomes editable
    /// again.
    pub fn set_part_code(&mut self, row: RowId, code: &str) -> Result<(), ReconError> {
        let fields = self.parts.fields_mut(row)?;
        if fields.code != code {
            if fields.catalog_id.take().is_some() {
                log::debug!("{row}: code retyped, catalog link cleared");
            }
            fields.code = code.to_string();
            self.lookups.clear_advisory(row);
        }
        Ok(())
    }

    /// Update the description and restart the debounce window. Terms under
    /// the configured minimum cancel any pending search and drop results.
    pub fn set_part_description(
        &mut self,
        row: RowId,
        text: &str,
        now: Instant,
    ) -> Result<(), ReconError> {
        let fields = self.parts.fields_mut(row)?;
        fields.description = text.to_string();

        let term = text.trim();
        if term.chars().count() >= self.config.lookup.min_description_length {
            let due_at = now + self.config.lookup.debounce();
            self.lookups.schedule_description(row, term.to_string(), due_at);
        } else {
            self.lookups.clear_description(row);
        }
        Ok(())
    }

    pub fn set_part_quantity(&mut self, row: RowId, quantity: f64) -> Result<(), ReconError> {
        self.parts.fields_mut(row)?.set_quantity(quantity);
        Ok(())
    }

    pub fn set_part_unit_price(&mut self, row: RowId, cents: i64) -> Result<(), ReconError> {
        self.parts.fields_mut(row)?.set_unit_price_cents(cents);
        Ok(())
    }

    /// Rejected while the row is linked to a catalog entry.
    pub fn set_part_unit(&mut self, row: RowId, unit: &str) -> Result<(), ReconError> {
        let fields = self.parts.fields_mut(row)?;
        if fields.is_catalog_linked() {
            return Err(ReconError::FieldReadOnly { row, field: "unit" });
        }
        fields.unit = unit.to_string();
        Ok(())
    }

    pub fn unit_is_derived(&self, row: RowId) -> Result<bool, ReconError> {
        Ok(self.parts.require(row)?.fields().is_catalog_linked())
    }

    pub fn part_lookup(&self, row: RowId) -> Option<&PartLookupState> {
        self.lookups.get(row)
    }

    // -----------------------------------------------------------------------
    // Catalog lookups
    // -----------------------------------------------------------------------

    /// Dispatch a code lookup for the row's current code. `None` when the
    /// trimmed code is shorter than the configured minimum.
    pub fn request_code_lookup(&mut self, row: RowId) -> Result<Option<LookupTicket>, ReconError> {
        let current = self.parts.require(row)?;
        if !current.is_editing() {
            return Err(ReconError::NotEditing(row));
        }
        let term = current.fields().code.trim().to_string();
        if term.chars().count() < self.config.lookup.min_code_length {
            return Ok(None);
        }
        Ok(Some(self.lookups.dispatch(row, LookupMode::Code, term, 1)))
    }

    /// Dispatch every description search whose debounce elapsed by `now`.
    pub fn due_description_lookups(&mut self, now: Instant) -> Vec<LookupTicket> {
        let limit = self.config.lookup.result_limit;
        let mut tickets = Vec::new();

        for (row, term) in self.lookups.take_due(now) {
            let current = self
                .parts
                .get(row)
                .filter(|r| r.is_editing())
                .map(|r| r.fields().description.trim());
            if current != Some(term.as_str()) {
                continue;
            }
            tickets.push(self.lookups.dispatch(row, LookupMode::Description, term, limit));
        }
        tickets
    }

    /// A reply applies only to the row's latest dispatch, and only while the
    /// row is still editing the same term.
    fn is_current(&self, ticket: &LookupTicket) -> bool {
        if !self.lookups.is_latest(ticket) {
            return false;
        }
        let Some(row) = self.parts.get(ticket.row()).filter(|r| r.is_editing()) else {
            return false;
        };
        let fields = row.fields();
        let term = match ticket.mode() {
            LookupMode::Code => fields.code.trim(),
            LookupMode::Description => fields.description.trim(),
        };
        term == ticket.term()
    }

    /// Feed a reply back. A stale reply (see `is_current`) is discarded
    /// without touching the row.
    pub fn resolve_lookup(
        &mut self,
        ticket: &LookupTicket,
        reply: Result<LookupReply, LookupError>,
    ) -> LookupOutcome {
        let row = ticket.row();
        if self.lookups.is_latest(ticket) {
            self.lookups.finish(ticket);
        }

        if !self.is_current(ticket) {
            log::debug!("{} lookup for {row} ('{}') is stale", ticket.mode(), ticket.term());
            return LookupOutcome::Stale;
        }

        match reply {
            Err(err) => {
                let message = err.to_string();
                log::warn!("{} lookup for {row} failed: {message}", ticket.mode());
                self.lookups
                    .set_advisory(row, LookupAdvisory::Failed { message: message.clone() });
                LookupOutcome::Failed(message)
            }
            Ok(LookupReply::Match(Some(part))) => match self.parts.fields_mut(row) {
                Ok(fields) => {
                    fields.apply_catalog(&part);
                    self.lookups.applied(row);
                    LookupOutcome::Applied(part)
                }
                Err(_) => LookupOutcome::Stale,
            },
            Ok(LookupReply::Match(None)) => {
                self.lookups.set_advisory(
                    row,
                    LookupAdvisory::NotFound { code: ticket.term().to_string() },
                );
                LookupOutcome::NotFound
            }
            Ok(LookupReply::Suggestions(parts)) => {
                let count = parts.len();
                self.lookups.set_suggestions(row, parts);
                LookupOutcome::Suggestions(count)
            }
        }
    }

    /// Run a ticket inline against `service` and resolve it.
    pub fn run_lookup<S>(&mut self, service: &S, ticket: &LookupTicket) -> LookupOutcome
    where
        S: CatalogLookupService + ?Sized,
    {
        let reply = perform(service, ticket);
        self.resolve_lookup(ticket, reply)
    }

    /// Copy a stored description suggestion into the row.
    pub fn select_suggestion(&mut self, row: RowId, index: usize) -> Result<CatalogPart, ReconError> {
        let part = self
            .lookups
            .suggestion(row, index)
            .cloned()
            .ok_or(ReconError::NoSuchSuggestion { row, index })?;
        self.parts.fields_mut(row)?.apply_catalog(&part);
        self.lookups.applied(row);
        Ok(part)
    }

    // -----------------------------------------------------------------------
    // Totals, summary, submission
    // -----------------------------------------------------------------------

    pub fn displacement_totals(&self) -> DisplacementTotals {
        displacement_totals(&self.displacements)
    }

    pub fn parts_total_cents(&self) -> i64 {
        parts_total_cents(&self.parts)
    }

    pub fn summary(&self) -> ReconSummary {
        ReconSummary {
            displacements: summarize_collection(
                self.displacement_originals.iter().map(|e| &e.origin),
                &self.displacements,
            ),
            parts: summarize_collection(self.part_originals.iter().map(|e| &e.origin), &self.parts),
            displacement_totals: self.displacement_totals(),
            parts_total_cents: self.parts_total_cents(),
        }
    }

    pub fn submission_payload(&self) -> SubmissionPayload {
        build_payload(self.order_id, &self.displacements, &self.parts)
    }

    pub fn submit<S: SubmissionSink>(&self, sink: &mut S) -> Result<SubmissionPayload, S::Error> {
        let payload = self.submission_payload();
        if payload.unsaved_drafts > 0 {
            log::warn!("{} unsaved drafts left out of submission", payload.unsaved_drafts);
        }
        sink.submit(&payload)?;
        Ok(payload)
    }
}
