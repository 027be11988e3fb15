//! Review scripts: a JSON array of reviewer actions replayed against a
//! loaded order.
//!
//! ```json
//! [
//!   { "op": "accept_all" },
//!   { "op": "edit_part", "row": { "origin": "id:77" }, "set": { "quantity": 5 } },
//!   { "op": "add_part", "set": { "code": "BRG-6204", "quantity": 2, "lookup": true } },
//!   { "op": "delete_part", "row": { "new": 0 } }
//! ]
//! ```
//!
//! Rows are addressed by origin key, or by the ordinal of a row added
//! earlier in the same script (`{"new": 0}` is the first `add_*` of that
//! collection).

use std::path::Path;
use std::time::Instant;

use serde::Deserialize;

use fieldrev_recon::{
    AcceptOutcome, InMemoryCatalog, LookupOutcome, OriginKey, ReconError, Reconciler, RowId,
    SaveOutcome, ValidationError,
};

use crate::exit_codes::{recon_exit_code, EXIT_CATALOG, EXIT_STEP_REJECTED};
use crate::CliError;

// ---------------------------------------------------------------------------
// Script format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRef {
    Origin(OriginKey),
    New(usize),
}

impl std::fmt::Display for RowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Origin(key) => write!(f, "origin {key}"),
            Self::New(n) => write!(f, "new #{n}"),
        }
    }
}

/// Part fields to set. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartChanges {
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price_cents: Option<i64>,
    /// Look the code up in the catalog after the other fields are set.
    #[serde(default)]
    pub lookup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DisplacementChanges {
    pub outbound_km: Option<f64>,
    pub return_km: Option<f64>,
    pub outbound_minutes: Option<u32>,
    pub return_minutes: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReviewOp {
    AcceptAll,
    AcceptPart { index: usize },
    AcceptDisplacement { index: usize },
    AddPart {
        #[serde(default)]
        set: PartChanges,
    },
    AddDisplacement {
        #[serde(default)]
        set: DisplacementChanges,
    },
    EditPart {
        row: RowRef,
        #[serde(default)]
        set: PartChanges,
    },
    EditDisplacement {
        row: RowRef,
        #[serde(default)]
        set: DisplacementChanges,
    },
    DeletePart { row: RowRef },
    RestorePart { row: RowRef },
    DeleteDisplacement { row: RowRef },
    RestoreDisplacement { row: RowRef },
}

impl ReviewOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AcceptAll => "accept_all",
            Self::AcceptPart { .. } => "accept_part",
            Self::AcceptDisplacement { .. } => "accept_displacement",
            Self::AddPart { .. } => "add_part",
            Self::AddDisplacement { .. } => "add_displacement",
            Self::EditPart { .. } => "edit_part",
            Self::EditDisplacement { .. } => "edit_displacement",
            Self::DeletePart { .. } => "delete_part",
            Self::RestorePart { .. } => "restore_part",
            Self::DeleteDisplacement { .. } => "delete_displacement",
            Self::RestoreDisplacement { .. } => "restore_displacement",
        }
    }
}

pub fn parse_script(json: &str) -> Result<Vec<ReviewOp>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn load_script(path: &Path) -> Result<Vec<ReviewOp>, CliError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| CliError::input(format!("cannot read script {}: {e}", path.display())))?;
    parse_script(&json).map_err(|e| {
        CliError::input(format!("invalid script {}: {e}", path.display()))
            .with_hint("a script is a JSON array of {\"op\": ...} objects")
    })
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum StepFailure {
    Recon(ReconError),
    Invalid(ValidationError),
    Unresolved(String),
    NoCatalog,
}

impl From<ReconError> for StepFailure {
    fn from(err: ReconError) -> Self {
        Self::Recon(err)
    }
}

/// What a script run did, for the stderr summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub steps: usize,
    pub catalog_matches: usize,
    pub catalog_misses: usize,
}

struct ScriptRunner<'a> {
    recon: &'a mut Reconciler,
    catalog: Option<&'a InMemoryCatalog>,
    added_parts: Vec<RowId>,
    added_displacements: Vec<RowId>,
    report: ScriptReport,
}

/// Replay `steps` in order. Stops at the first rejected step; earlier steps
/// stay applied.
pub fn run_script(
    recon: &mut Reconciler,
    catalog: Option<&InMemoryCatalog>,
    steps: &[ReviewOp],
) -> Result<ScriptReport, CliError> {
    let mut runner = ScriptRunner {
        recon,
        catalog,
        added_parts: Vec::new(),
        added_displacements: Vec::new(),
        report: ScriptReport::default(),
    };

    for (i, op) in steps.iter().enumerate() {
        let step = i + 1;
        log::debug!("step {step}: {}", op.name());
        runner.apply(op).map_err(|failure| step_error(step, op, failure))?;
        runner.report.steps += 1;
    }

    Ok(runner.report)
}

fn step_error(step: usize, op: &ReviewOp, failure: StepFailure) -> CliError {
    let prefix = format!("step {step} ({})", op.name());
    match failure {
        StepFailure::Recon(err) => CliError {
            code: recon_exit_code(&err),
            message: format!("{prefix}: {err}"),
            hint: None,
        },
        StepFailure::Invalid(err) => CliError {
            code: EXIT_STEP_REJECTED,
            message: format!("{prefix}: save rejected: {err}"),
            hint: None,
        },
        StepFailure::Unresolved(message) => CliError {
            code: EXIT_STEP_REJECTED,
            message: format!("{prefix}: {message}"),
            hint: Some("rows are addressed as {\"origin\": \"<key>\"} or {\"new\": <n>}".into()),
        },
        StepFailure::NoCatalog => CliError {
            code: EXIT_CATALOG,
            message: format!("{prefix}: catalog lookup requested but no catalog loaded"),
            hint: Some("pass --catalog <parts.csv>".into()),
        },
    }
}

impl ScriptRunner<'_> {
    fn apply(&mut self, op: &ReviewOp) -> Result<(), StepFailure> {
        match op {
            ReviewOp::AcceptAll => {
                self.recon.accept_all();
            }
            ReviewOp::AcceptPart { index } => {
                if let AcceptOutcome::AlreadyPresent(row) = self.recon.accept_part(*index)? {
                    log::info!("part original {index} already accepted as {row}");
                }
            }
            ReviewOp::AcceptDisplacement { index } => {
                if let AcceptOutcome::AlreadyPresent(row) = self.recon.accept_displacement(*index)? {
                    log::info!("displacement original {index} already accepted as {row}");
                }
            }
            ReviewOp::AddPart { set } => {
                let row = self.recon.add_part();
                self.added_parts.push(row);
                self.apply_part_changes(row, set)?;
                self.save_part(row)?;
            }
            ReviewOp::AddDisplacement { set } => {
                let row = self.recon.add_displacement();
                self.added_displacements.push(row);
                self.apply_displacement_changes(row, set)?;
                self.save_displacement(row)?;
            }
            ReviewOp::EditPart { row, set } => {
                let row = self.part_row(row)?;
                self.recon.edit_part(row)?;
                self.apply_part_changes(row, set)?;
                self.save_part(row)?;
            }
            ReviewOp::EditDisplacement { row, set } => {
                let row = self.displacement_row(row)?;
                self.recon.edit_displacement(row)?;
                self.apply_displacement_changes(row, set)?;
                self.save_displacement(row)?;
            }
            ReviewOp::DeletePart { row } => {
                let row = self.part_row(row)?;
                self.recon.delete_part(row)?;
            }
            ReviewOp::RestorePart { row } => {
                let row = self.part_row(row)?;
                if !self.recon.restore_part(row)? {
                    log::info!("part {row} was not deleted");
                }
            }
            ReviewOp::DeleteDisplacement { row } => {
                let row = self.displacement_row(row)?;
                self.recon.delete_displacement(row)?;
            }
            ReviewOp::RestoreDisplacement { row } => {
                let row = self.displacement_row(row)?;
                if !self.recon.restore_displacement(row)? {
                    log::info!("displacement {row} was not deleted");
                }
            }
        }
        Ok(())
    }

    fn part_row(&self, row: &RowRef) -> Result<RowId, StepFailure> {
        let found = match row {
            RowRef::Origin(key) => self.recon.parts().row_for_origin(key),
            RowRef::New(n) => self.added_parts.get(*n).copied(),
        };
        found.ok_or_else(|| StepFailure::Unresolved(format!("no part row for {row}")))
    }

    fn displacement_row(&self, row: &RowRef) -> Result<RowId, StepFailure> {
        let found = match row {
            RowRef::Origin(key) => self.recon.displacements().row_for_origin(key),
            RowRef::New(n) => self.added_displacements.get(*n).copied(),
        };
        found.ok_or_else(|| StepFailure::Unresolved(format!("no displacement row for {row}")))
    }

    fn apply_part_changes(&mut self, row: RowId, set: &PartChanges) -> Result<(), StepFailure> {
        if let Some(code) = &set.code {
            self.recon.set_part_code(row, code)?;
        }
        if let Some(description) = &set.description {
            self.recon.set_part_description(row, description, Instant::now())?;
        }
        if let Some(unit) = &set.unit {
            self.recon.set_part_unit(row, unit)?;
        }
        if let Some(quantity) = set.quantity {
            self.recon.set_part_quantity(row, quantity)?;
        }
        if let Some(cents) = set.unit_price_cents {
            self.recon.set_part_unit_price(row, cents)?;
        }
        if set.lookup {
            self.lookup_code(row)?;
        }
        Ok(())
    }

    fn lookup_code(&mut self, row: RowId) -> Result<(), StepFailure> {
        let catalog = self.catalog.ok_or(StepFailure::NoCatalog)?;
        let Some(ticket) = self.recon.request_code_lookup(row)? else {
            log::warn!("{row}: code too short for a catalog lookup");
            return Ok(());
        };
        match self.recon.run_lookup(catalog, &ticket) {
            LookupOutcome::Applied(part) => {
                log::info!("{row}: linked to catalog part {} ({})", part.id, part.code);
                self.report.catalog_matches += 1;
            }
            LookupOutcome::NotFound => {
                log::warn!("{row}: code '{}' not found in catalog", ticket.term());
                self.report.catalog_misses += 1;
            }
            other => log::debug!("{row}: lookup ended as {other:?}"),
        }
        Ok(())
    }

    fn apply_displacement_changes(
        &mut self,
        row: RowId,
        set: &DisplacementChanges,
    ) -> Result<(), StepFailure> {
        self.recon.update_displacement(row, |d| {
            if let Some(km) = set.outbound_km {
                d.outbound_km = km;
            }
            if let Some(km) = set.return_km {
                d.return_km = km;
            }
            if let Some(minutes) = set.outbound_minutes {
                d.outbound_minutes = minutes;
            }
            if let Some(minutes) = set.return_minutes {
                d.return_minutes = minutes;
            }
            if let Some(notes) = &set.notes {
                d.notes = notes.clone();
            }
        })?;
        Ok(())
    }

    fn save_part(&mut self, row: RowId) -> Result<(), StepFailure> {
        match self.recon.save_part(row)? {
            SaveOutcome::Invalid(err) => Err(StepFailure::Invalid(err)),
            SaveOutcome::Saved | SaveOutcome::NotEditing => Ok(()),
        }
    }

    fn save_displacement(&mut self, row: RowId) -> Result<(), StepFailure> {
        match self.recon.save_displacement(row)? {
            SaveOutcome::Invalid(err) => Err(StepFailure::Invalid(err)),
            SaveOutcome::Saved | SaveOutcome::NotEditing => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrev_core::{OriginalPart, VisitReport};
    use fieldrev_recon::ReconConfig;

    fn order() -> Reconciler {
        let reports = vec![VisitReport {
            id: 1,
            parts: Some(vec![OriginalPart {
                id: Some(77),
                code: Some("HSE-3".into()),
                description: "Hose".into(),
                quantity: 1.0,
                ..Default::default()
            }]),
            ..Default::default()
        }];
        Reconciler::new(ReconConfig::default(), &reports)
    }

    #[test]
    fn parses_tagged_ops() {
        let steps = parse_script(
            r#"[
                { "op": "accept_all" },
                { "op": "edit_part", "row": { "origin": "id:77" }, "set": { "quantity": 5 } },
                { "op": "add_displacement" },
                { "op": "delete_part", "row": { "new": 0 } }
            ]"#,
        )
        .unwrap();
        assert_eq!(steps[0], ReviewOp::AcceptAll);
        assert_eq!(
            steps[1],
            ReviewOp::EditPart {
                row: RowRef::Origin("id:77".into()),
                set: PartChanges { quantity: Some(5.0), ..Default::default() },
            }
        );
        assert_eq!(steps[2], ReviewOp::AddDisplacement { set: DisplacementChanges::default() });
        assert_eq!(steps[3], ReviewOp::DeletePart { row: RowRef::New(0) });
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(parse_script(r#"[{ "op": "merge_parts" }]"#).is_err());
    }

    #[test]
    fn edits_and_new_rows() {
        let mut recon = order();
        let steps = parse_script(
            r#"[
                { "op": "accept_all" },
                { "op": "edit_part", "row": { "origin": "id:77" },
                  "set": { "quantity": 3, "unit_price_cents": 1250 } },
                { "op": "add_part", "set": { "code": "TAP-PTFE", "quantity": 1 } },
                { "op": "delete_part", "row": { "new": 0 } },
                { "op": "restore_part", "row": { "new": 0 } }
            ]"#,
        )
        .unwrap();

        let report = run_script(&mut recon, None, &steps).unwrap();
        assert_eq!(report.steps, 5);
        assert_eq!(recon.parts_total_cents(), 3750);
        assert_eq!(recon.parts().live().count(), 2);
    }

    #[test]
    fn invalid_save_stops_script() {
        let mut recon = order();
        let steps = parse_script(
            r#"[
                { "op": "add_part", "set": { "quantity": 1 } },
                { "op": "accept_all" }
            ]"#,
        )
        .unwrap();

        let err = run_script(&mut recon, None, &steps).unwrap_err();
        assert_eq!(err.code, EXIT_STEP_REJECTED);
        assert!(err.message.starts_with("step 1 (add_part)"));
        assert!(recon.parts().row_for_origin(&"id:77".into()).is_none());
    }

    #[test]
    fn unresolved_row_reference() {
        let mut recon = order();
        let steps = parse_script(r#"[{ "op": "delete_part", "row": { "origin": "id:1" } }]"#).unwrap();
        let err = run_script(&mut recon, None, &steps).unwrap_err();
        assert_eq!(err.code, EXIT_STEP_REJECTED);
        assert!(err.message.contains("no part row for origin id:1"));
    }

    #[test]
    fn lookup_without_catalog() {
        let mut recon = order();
        let steps =
            parse_script(r#"[{ "op": "add_part", "set": { "code": "FLT-10", "lookup": true } }]"#)
                .unwrap();
        let err = run_script(&mut recon, None, &steps).unwrap_err();
        assert_eq!(err.code, EXIT_CATALOG);
    }
}
