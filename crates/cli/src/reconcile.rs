//! `frev reconcile`: load an order, apply a review and emit the payload.

use std::path::{Path, PathBuf};

use fieldrev_recon::source::read_snapshot;
use fieldrev_recon::summary::CollectionSummary;
use fieldrev_recon::totals::format_cents;
use fieldrev_recon::{JsonSnapshotSource, ReconConfig, ReconError, Reconciler};

use crate::catalog::load_catalog;
use crate::exit_codes::{recon_exit_code, EXIT_CONFIG_INVALID, EXIT_ERROR};
use crate::script::{load_script, run_script};
use crate::sink::JsonFileSink;
use crate::CliError;

pub struct ReconcileArgs {
    pub snapshot: PathBuf,
    pub order: Option<i64>,
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

fn recon_err(err: ReconError) -> CliError {
    CliError { code: recon_exit_code(&err), message: err.to_string(), hint: None }
}

pub fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_CONFIG_INVALID,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    ReconConfig::from_toml(&config_str).map_err(recon_err)
}

fn load_order(args: &ReconcileArgs, config: ReconConfig) -> Result<Reconciler, CliError> {
    match args.order {
        Some(order_id) => {
            let source = JsonSnapshotSource::new(&args.snapshot);
            Reconciler::load(&source, order_id, config).map_err(recon_err)
        }
        None if args.snapshot.is_dir() => Err(CliError::input(format!(
            "{} is a directory",
            args.snapshot.display()
        ))
        .with_hint("pass --order <id> to pick <id>.json from it")),
        None => {
            let snapshot = read_snapshot(&args.snapshot).map_err(recon_err)?;
            Reconciler::load(&snapshot, snapshot.order_id, config).map_err(recon_err)
        }
    }
}

pub fn cmd_reconcile(args: ReconcileArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReconConfig::default(),
    };
    let catalog = args.catalog.as_deref().map(load_catalog).transpose()?;
    let mut recon = load_order(&args, config)?;

    match &args.script {
        Some(path) => {
            let steps = load_script(path)?;
            let report = run_script(&mut recon, catalog.as_ref(), &steps)?;
            eprintln!(
                "script: {} steps applied, {} catalog matches, {} misses",
                report.steps, report.catalog_matches, report.catalog_misses
            );
        }
        None => {
            recon.accept_all();
        }
    }

    let payload = match &args.output {
        Some(path) => {
            let mut sink = JsonFileSink::new(path);
            let payload = recon
                .submit(&mut sink)
                .map_err(|e| CliError::input(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
            payload
        }
        None => recon.submission_payload(),
    };

    if args.json {
        let json_str = serde_json::to_string_pretty(&payload).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json_str}");
    }

    print_summary(&recon);
    Ok(())
}

fn collection_line(label: &str, s: &CollectionSummary) -> String {
    format!(
        "{label}: {} originals ({} accepted, {} deleted, {} pending), {} live rows, {} net-new",
        s.originals, s.accepted, s.accepted_deleted, s.pending, s.live_rows, s.net_new
    )
}

/// Human summary to stderr.
fn print_summary(recon: &Reconciler) {
    let summary = recon.summary();
    let t = &summary.displacement_totals;

    match recon.order_id() {
        Some(id) => eprintln!("order {id}"),
        None => eprintln!("order (unknown)"),
    }
    eprintln!("{}", collection_line("displacements", &summary.displacements));
    eprintln!(
        "  travel: {} legs, {} km out + {} km back = {} km, {} min",
        t.legs, t.outbound_km, t.return_km, t.total_km, t.total_minutes
    );
    eprintln!("{}", collection_line("parts", &summary.parts));
    eprintln!("  parts total: {}", format_cents(summary.parts_total_cents));

    if summary.drafts() > 0 {
        eprintln!("warning: {} unsaved drafts not submitted", summary.drafts());
    }
}
