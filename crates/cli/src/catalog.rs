//! `frev catalog`: query a parts catalog CSV the way the review screen does.

use std::path::{Path, PathBuf};

use fieldrev_core::CatalogPart;
use fieldrev_recon::config::LookupConfig;
use fieldrev_recon::{CatalogLookupService, InMemoryCatalog};

use crate::exit_codes::{recon_exit_code, EXIT_ERROR};
use crate::CliError;

pub struct CatalogArgs {
    pub catalog: PathBuf,
    pub code: Option<String>,
    pub description: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
}

pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog, CliError> {
    let csv_data = std::fs::read_to_string(path)
        .map_err(|e| CliError::catalog(format!("cannot read catalog {}: {e}", path.display())))?;
    let catalog = InMemoryCatalog::from_csv(&csv_data).map_err(|e| CliError {
        code: recon_exit_code(&e),
        message: format!("{}: {e}", path.display()),
        hint: Some("expected CSV headers: id,code,description,unit".into()),
    })?;
    log::debug!("loaded {} catalog parts from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn lookup_err(e: impl std::fmt::Display) -> CliError {
    CliError::catalog(format!("catalog lookup failed: {e}"))
}

pub fn cmd_catalog(args: CatalogArgs) -> Result<(), CliError> {
    let catalog = load_catalog(&args.catalog)?;

    let parts: Vec<CatalogPart> = match (&args.code, &args.description) {
        (Some(code), None) => {
            let found = catalog.search_by_code(code).map_err(lookup_err)?;
            match found {
                Some(part) => vec![part],
                None => {
                    return Err(CliError {
                        code: EXIT_ERROR,
                        message: format!("no catalog part with code '{}'", code.trim()),
                        hint: None,
                    }
                    .with_hint("try --description for a fuzzy search"))
                }
            }
        }
        (None, Some(term)) => {
            let limit = args.limit.unwrap_or(LookupConfig::default().result_limit);
            if limit == 0 {
                return Err(CliError::usage("--limit must be at least 1"));
            }
            catalog.search_by_description(term, limit).map_err(lookup_err)?
        }
        _ => {
            return Err(CliError::usage("give exactly one of --code or --description"))
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&parts)
            .map_err(|e| CliError { code: EXIT_ERROR, message: format!("JSON serialization error: {e}"), hint: None })?;
        println!("{json}");
    } else {
        for part in &parts {
            println!("{}\t{}\t{}\t{}", part.id, part.code, part.description, part.unit);
        }
    }
    eprintln!("{} of {} catalog parts matched", parts.len(), catalog.len());
    Ok(())
}
