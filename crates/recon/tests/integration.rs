use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fieldrev_core::{OriginalDisplacement, OriginalPart, VisitReport};
use fieldrev_recon::lookup::{debounce, perform_async};
use fieldrev_recon::submission::SubmissionPayload;
use fieldrev_recon::{
    CancelOutcome, DeleteOutcome, DisplacementFields, InMemoryCatalog, JsonSnapshotSource, LookupMode, LookupOutcome,
    OriginKey, OriginStatus, PartFields, ReconConfig, ReconError, Reconciler, SaveOutcome,
    SubmissionSink, ValidationError,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config(name: &str) -> ReconConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    ReconConfig::from_toml(&toml).unwrap()
}

fn load_order(config: ReconConfig) -> Reconciler {
    let source = JsonSnapshotSource::new(fixtures_dir().join("order-1042.json"));
    Reconciler::load(&source, 1042, config).unwrap()
}

fn load_catalog() -> Arc<InMemoryCatalog> {
    let csv = std::fs::read_to_string(fixtures_dir().join("catalog.csv")).unwrap();
    Arc::new(InMemoryCatalog::from_csv(&csv).unwrap())
}

#[derive(Default)]
struct MemorySink {
    received: Vec<SubmissionPayload>,
}

impl SubmissionSink for MemorySink {
    type Error = std::convert::Infallible;

    fn submit(&mut self, payload: &SubmissionPayload) -> Result<(), Self::Error> {
        self.received.push(payload.clone());
        Ok(())
    }
}

// -------------------------------------------------------------------------
// Identity + accept
// -------------------------------------------------------------------------

#[test]
fn reaccept_after_delete_does_not_resurrect() {
    let reports = vec![
        VisitReport {
            id: 1,
            parts: Some(vec![OriginalPart {
                catalog_id: Some(10),
                description: "Oil filter".into(),
                quantity: 2.0,
                ..Default::default()
            }]),
            ..Default::default()
        },
        VisitReport {
            id: 2,
            parts: Some(vec![OriginalPart {
                id: Some(77),
                description: "Hose".into(),
                quantity: 1.0,
                ..Default::default()
            }]),
            ..Default::default()
        },
    ];
    let mut recon = Reconciler::new(ReconConfig::default(), &reports);

    assert_eq!(recon.accept_all_parts().len(), 2);
    assert_eq!(recon.parts().len(), 2);

    assert!(recon.accept_all_parts().is_empty());
    assert_eq!(recon.parts().len(), 2);

    let hose = recon.parts().row_for_origin(&"id:77".into()).unwrap();
    assert_eq!(recon.delete_part(hose).unwrap(), DeleteOutcome::Tombstoned);
    assert!(recon.accept_all_parts().is_empty());
    assert_eq!(recon.parts().len(), 2);
    assert_eq!(recon.parts().live().count(), 1);

    let payload = recon.submission_payload();
    assert_eq!(payload.parts.committed_rows.len(), 1);
    assert_eq!(payload.parts.committed_rows[0].origin, Some("catalog:10".into()));
    assert_eq!(payload.parts.deleted_origin_keys, vec![OriginKey::from("id:77")]);
}

#[test]
fn snapshot_shared_fallback_collapses_lookalikes() {
    let mut recon = load_order(load_config("recon.toml"));
    assert_eq!(recon.order_id(), Some(1042));
    assert_eq!(recon.part_originals().len(), 4);
    assert_eq!(recon.displacement_originals().len(), 2);

    let origins: Vec<&str> = recon.part_originals().iter().map(|e| e.origin.as_str()).collect();
    assert_eq!(
        origins,
        vec!["catalog:10", "fat:501:ptfe tape:1", "fat:501:ptfe tape:1", "id:77"]
    );
    assert_eq!(recon.displacement_originals()[1].origin.as_str(), "fat:502::42");

    let report = recon.accept_all();
    assert_eq!(report.displacements.len(), 2);
    assert_eq!(report.parts.len(), 3);

    // The second tape line shares the first one's key.
    assert_eq!(recon.part_status(2).unwrap(), recon.part_status(1).unwrap());
    assert_eq!(recon.summary().pending(), 0);
}

#[test]
fn snapshot_positional_fallback_keeps_lookalikes_apart() {
    let mut recon = load_order(load_config("positional.toml"));
    let origins: Vec<&str> = recon.part_originals().iter().map(|e| e.origin.as_str()).collect();
    assert_eq!(
        origins,
        vec!["catalog:10", "fat:501:ptfe tape:1#0", "fat:501:ptfe tape:1#1", "id:77"]
    );
    assert_eq!(recon.accept_all().parts.len(), 4);
}

type RevisedSet = (
    Vec<(Option<OriginKey>, DisplacementFields)>,
    Vec<(Option<OriginKey>, PartFields)>,
);

fn revised_set(recon: &Reconciler) -> RevisedSet {
    (
        recon.displacements().iter().map(|r| (r.origin().cloned(), r.fields().clone())).collect(),
        recon.parts().iter().map(|r| (r.origin().cloned(), r.fields().clone())).collect(),
    )
}

#[test]
fn accept_all_is_idempotent_across_identity_kinds() {
    for config in ["recon.toml", "positional.toml"] {
        let mut recon = load_order(load_config(config));
        // id:, catalog: and fat: keys all present in the snapshot
        let kinds: Vec<&str> = recon
            .part_originals()
            .iter()
            .map(|e| e.origin.as_str().split(':').next().unwrap())
            .collect();
        assert!(kinds.contains(&"id") && kinds.contains(&"catalog") && kinds.contains(&"fat"));

        assert!(recon.accept_all().inserted() > 0, "{config}");
        let once = revised_set(&recon);

        assert_eq!(recon.accept_all().inserted(), 0, "{config}");
        assert_eq!(revised_set(&recon), once, "{config}");
    }
}

#[test]
fn groups_follow_visit_reports() {
    let recon = load_order(ReconConfig::default());
    let groups = recon.part_groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].visit_report_id, 501);
    assert_eq!(groups[0].indices, vec![0, 1, 2]);
    assert_eq!(groups[1].visit_report_id, 502);
    assert_eq!(groups[1].indices, vec![3]);
}

#[test]
fn wrong_order_id_is_rejected() {
    let source = JsonSnapshotSource::new(fixtures_dir().join("order-1042.json"));
    let err = Reconciler::load(&source, 7, ReconConfig::default()).unwrap_err();
    assert!(matches!(err, ReconError::Source(_)));
}

// -------------------------------------------------------------------------
// Row lifecycle
// -------------------------------------------------------------------------

#[test]
fn cancel_new_row_removes_it() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.add_part();
    assert_eq!(recon.cancel_part(row).unwrap(), CancelOutcome::Removed);
    assert!(recon.parts().is_empty());
    assert!(matches!(recon.edit_part(row), Err(ReconError::UnknownRow(_))));
}

#[test]
fn save_blocked_until_required_fields_present() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.add_part();
    recon.set_part_quantity(row, 1.0).unwrap();

    assert_eq!(
        recon.save_part(row).unwrap(),
        SaveOutcome::Invalid(ValidationError::EmptyPartCode)
    );
    assert!(recon.parts().get(row).unwrap().is_editing());

    recon.set_part_code(row, "TAP-PTFE").unwrap();
    assert_eq!(recon.save_part(row).unwrap(), SaveOutcome::Saved);
    assert!(!recon.parts().get(row).unwrap().is_editing());
}

#[test]
fn cancel_edit_restores_snapshot() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.accept_part(3).unwrap().row();
    recon.edit_part(row).unwrap();
    recon.set_part_quantity(row, 9.0).unwrap();
    recon.set_part_code(row, "HSE-9").unwrap();

    assert_eq!(recon.cancel_part(row).unwrap(), CancelOutcome::Reverted);
    let fields = recon.parts().get(row).unwrap().fields();
    assert_eq!(fields.quantity(), 1.0);
    assert_eq!(fields.code, "HSE-3");
    assert_eq!(fields.catalog_id, Some(12));
}

#[test]
fn delete_restore_round_trip() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.accept_displacement(0).unwrap().row();
    let before = recon.displacements().get(row).unwrap().clone();

    recon.delete_displacement(row).unwrap();
    assert_eq!(recon.displacement_status(0).unwrap(), OriginStatus::AcceptedDeleted(row));
    assert!(matches!(
        recon.edit_displacement(row),
        Err(ReconError::InvalidTransition { .. })
    ));

    assert!(recon.restore_displacement(row).unwrap());
    assert_eq!(recon.displacements().get(row).unwrap(), &before);
    assert_eq!(recon.displacement_status(0).unwrap(), OriginStatus::Accepted(row));
}

#[test]
fn deleting_row_under_edit_discards_working_values() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.accept_part(0).unwrap().row();
    recon.edit_part(row).unwrap();
    recon.set_part_quantity(row, 40.0).unwrap();
    recon.delete_part(row).unwrap();
    recon.restore_part(row).unwrap();
    assert_eq!(recon.parts().get(row).unwrap().fields().quantity(), 2.0);
}

#[test]
fn negative_distance_blocks_save() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.add_displacement();
    recon.update_displacement(row, |d| d.outbound_km = -1.0).unwrap();
    assert_eq!(
        recon.save_displacement(row).unwrap(),
        SaveOutcome::Invalid(ValidationError::NegativeDistance)
    );
}

// -------------------------------------------------------------------------
// Totals
// -------------------------------------------------------------------------

#[test]
fn part_total_tracks_quantity_changes() {
    let mut recon = load_order(ReconConfig::default());
    let row = recon.accept_part(3).unwrap().row();
    recon.edit_part(row).unwrap();
    recon.set_part_quantity(row, 3.0).unwrap();
    recon.set_part_unit_price(row, 1250).unwrap();
    assert_eq!(recon.parts().get(row).unwrap().fields().total_cents(), 3750);

    recon.set_part_quantity(row, 5.0).unwrap();
    assert_eq!(recon.parts().get(row).unwrap().fields().total_cents(), 6250);
    recon.save_part(row).unwrap();
    assert_eq!(recon.parts_total_cents(), 6250);
}

#[test]
fn displacement_summary_over_live_rows() {
    let mut recon = load_order(ReconConfig::default());
    recon.accept_all_displacements();
    let totals = recon.displacement_totals();
    assert_eq!(totals.legs, 2);
    assert_eq!(totals.total_km, 79.0);
    assert_eq!(totals.total_minutes, 113);

    let first = recon.displacements().row_for_origin(&"id:9001".into()).unwrap();
    recon.delete_displacement(first).unwrap();
    let totals = recon.displacement_totals();
    assert_eq!(totals.legs, 1);
    assert_eq!(totals.total_km, 42.0);
}

#[test]
fn summary_survives_extreme_minutes() {
    let leg = OriginalDisplacement {
        id: Some(1),
        outbound_minutes: 3_000_000_000,
        return_minutes: 3_000_000_000,
        ..Default::default()
    };
    let reports = vec![VisitReport {
        id: 1,
        displacements: Some(vec![leg.clone(), OriginalDisplacement { id: Some(2), ..leg }]),
        ..Default::default()
    }];
    let mut recon = Reconciler::new(ReconConfig::default(), &reports);
    recon.accept_all();

    assert_eq!(recon.summary().displacement_totals.total_minutes, 12_000_000_000);
}

// -------------------------------------------------------------------------
// Catalog lookups
// -------------------------------------------------------------------------

#[test]
fn out_of_order_code_replies() {
    let catalog = load_catalog();
    let mut recon = load_order(load_config("recon.toml"));
    let row = recon.add_part();

    recon.set_part_code(row, "FLT-10").unwrap();
    let first = recon.request_code_lookup(row).unwrap().unwrap();
    recon.set_part_code(row, "HSE-3").unwrap();
    let second = recon.request_code_lookup(row).unwrap().unwrap();

    smol::block_on(async {
        let (ticket, reply) = perform_async(catalog.clone(), first).await;
        assert_eq!(recon.resolve_lookup(&ticket, reply), LookupOutcome::Stale);
        // the newer search is still outstanding
        assert_eq!(recon.part_lookup(row).unwrap().searching(), Some(LookupMode::Code));

        let (ticket, reply) = perform_async(catalog.clone(), second).await;
        let outcome = recon.resolve_lookup(&ticket, reply);
        assert!(matches!(outcome, LookupOutcome::Applied(ref p) if p.code == "HSE-3"));
    });

    let fields = recon.parts().get(row).unwrap().fields();
    assert_eq!(fields.catalog_id, Some(12));
    assert_eq!(fields.unit, "m");
    assert_eq!(recon.part_lookup(row).unwrap().searching(), None);
}

#[test]
fn description_search_after_debounce() {
    let catalog = load_catalog();
    let config = load_config("recon.toml");
    let mut recon = load_order(config.clone());
    let row = recon.add_part();

    recon.set_part_description(row, "oil filter", Instant::now()).unwrap();
    assert!(recon.due_description_lookups(Instant::now()).is_empty());

    smol::block_on(debounce(&config.lookup));
    let tickets = recon.due_description_lookups(Instant::now());
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].limit(), 5);

    let outcome = recon.run_lookup(catalog.as_ref(), &tickets[0]);
    assert_eq!(outcome, LookupOutcome::Suggestions(2));
    let suggestions = recon.part_lookup(row).unwrap().suggestions();
    assert_eq!(suggestions[0].code, "FLT-10");
    assert_eq!(suggestions[1].code, "FLT-12");

    recon.select_suggestion(row, 1).unwrap();
    let fields = recon.parts().get(row).unwrap().fields();
    assert_eq!(fields.code, "FLT-12");
    assert_eq!(fields.description, "Oil filter 12 micron");
    assert!(recon.unit_is_derived(row).unwrap());
}

#[test]
fn description_reply_after_further_typing_is_stale() {
    let catalog = load_catalog();
    let config = load_config("recon.toml");
    let mut recon = load_order(config.clone());
    let row = recon.add_part();

    recon.set_part_description(row, "bearing", Instant::now()).unwrap();
    smol::block_on(debounce(&config.lookup));
    let tickets = recon.due_description_lookups(Instant::now());
    assert_eq!(tickets.len(), 1);

    recon.set_part_description(row, "bearing 6205", Instant::now()).unwrap();
    assert_eq!(recon.run_lookup(catalog.as_ref(), &tickets[0]), LookupOutcome::Stale);
    assert!(recon.part_lookup(row).unwrap().suggestions().is_empty());
}

// -------------------------------------------------------------------------
// Submission
// -------------------------------------------------------------------------

#[test]
fn submit_full_review() {
    let mut recon = load_order(ReconConfig::default());
    recon.accept_all();

    let tape = recon.parts().row_for_origin(&"fat:501:ptfe tape:1".into()).unwrap();
    recon.delete_part(tape).unwrap();

    let added = recon.add_part();
    recon.set_part_code(added, "BRG-6204").unwrap();
    recon.set_part_quantity(added, 2.0).unwrap();
    recon.set_part_unit_price(added, 899).unwrap();
    recon.save_part(added).unwrap();

    let _draft = recon.add_displacement();

    let mut sink = MemorySink::default();
    let payload = recon.submit(&mut sink).unwrap();
    assert_eq!(sink.received.len(), 1);
    assert_eq!(sink.received[0], payload);

    assert_eq!(payload.order_id, Some(1042));
    assert_eq!(payload.unsaved_drafts, 1);
    assert_eq!(payload.parts.committed_rows.len(), 2);
    assert_eq!(payload.parts.deleted_origin_keys, vec![OriginKey::from("fat:501:ptfe tape:1")]);
    assert_eq!(payload.parts.new_rows.len(), 1);
    assert_eq!(payload.parts.new_rows[0].fields.total_cents(), 1798);
    assert_eq!(payload.displacements.committed_rows.len(), 2);
    assert!(payload.displacements.new_rows.is_empty());
}
