// frev - headless review of technician visit reports

mod catalog;
mod exit_codes;
mod reconcile;
mod script;
mod sink;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_CATALOG, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "frev")]
#[command(about = "Reconcile technician visit reports into a revised service order")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Log engine decisions to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a service order snapshot, apply a review and emit the payload
    #[command(after_help = "\
Examples:
  frev reconcile order-1042.json
  frev reconcile order-1042.json --script review.json --catalog parts.csv --json
  frev reconcile snapshots/ --order 1042 --config recon.toml --output payload.json")]
    Reconcile {
        /// Snapshot JSON file, or a directory of <order_id>.json files
        snapshot: PathBuf,

        /// Order to load (required when SNAPSHOT is a directory)
        #[arg(long)]
        order: Option<i64>,

        /// Path to a recon.toml config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Parts catalog CSV (id,code,description,unit)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Review script (JSON array of operations). Without one, every
        /// original is accepted as filed.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Output the payload JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the payload JSON to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  frev validate recon.toml")]
    Validate {
        /// Path to the recon.toml config file
        config: PathBuf,
    },

    /// Search a parts catalog CSV by code or description
    #[command(after_help = "\
Examples:
  frev catalog parts.csv --code FLT-10
  frev catalog parts.csv --description 'oil filter' --limit 5 --json")]
    Catalog {
        /// Parts catalog CSV (id,code,description,unit)
        catalog: PathBuf,

        /// Exact code match
        #[arg(long, conflicts_with = "description", required_unless_present = "description")]
        code: Option<String>,

        /// Fuzzy description search
        #[arg(long)]
        description: Option<String>,

        /// Maximum description results
        #[arg(long)]
        limit: Option<usize>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("FREV_GIT_HASH"), ")",
        "\ntarget:  ", env!("FREV_TARGET"),
        "\npayload: committed_rows/deleted_origin_keys/new_rows",
    )
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Reconcile { snapshot, order, config, catalog, script, json, output } => {
            reconcile::cmd_reconcile(reconcile::ReconcileArgs {
                snapshot,
                order,
                config,
                catalog,
                script,
                json,
                output,
            })
        }
        Commands::Validate { config } => cmd_validate(config),
        Commands::Catalog { catalog: path, code, description, limit, json } => {
            catalog::cmd_catalog(catalog::CatalogArgs { catalog: path, code, description, limit, json })
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = reconcile::load_config(&path)?;
    let l = &config.lookup;
    eprintln!("config OK: {}", path.display());
    eprintln!(
        "  lookup: code >= {} chars, description >= {} chars, debounce {}ms, limit {}",
        l.min_code_length, l.min_description_length, l.debounce_ms, l.result_limit
    );
    eprintln!("  identity fallback: {}", config.identity.fallback);
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn catalog(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CATALOG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
