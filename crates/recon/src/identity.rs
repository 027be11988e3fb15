//! Origin keys: stable identity for technician-submitted records.
//!
//! Originals often lack a durable id (ad hoc parts typed in the field), so
//! the key is resolved in priority order:
//!
//! 1. explicit id            → `id:<id>`
//! 2. catalog id             → `catalog:<catalog_id>`
//! 3. synthesized from context → `fat:<visit_report_id>:<description>:<quantity>`
//!
//! The description is trimmed and lowercased. Two originals in the same
//! visit report with the same description and quantity collapse onto one
//! `fat:` key under [`FallbackMode::Shared`]; [`FallbackMode::Positional`]
//! opts out of that by appending the occurrence ordinal.

use std::collections::HashMap;

use fieldrev_core::{OriginalDisplacement, OriginalPart, VisitReportId};
use serde::{Deserialize, Serialize};

use crate::config::FallbackMode;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginKey(String);

impl OriginKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> OriginKeyKind {
        if self.0.starts_with("id:") {
            OriginKeyKind::Explicit
        } else if self.0.starts_with("catalog:") {
            OriginKeyKind::Catalog
        } else {
            OriginKeyKind::Synthesized
        }
    }
}

impl std::fmt::Display for OriginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OriginKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKeyKind {
    Explicit,
    Catalog,
    Synthesized,
}

/// The inputs the resolver looks at, borrowed from an original record.
#[derive(Debug, Clone, Copy)]
pub struct IdentityFacts<'a> {
    pub id: Option<i64>,
    pub catalog_id: Option<i64>,
    pub visit_report_id: VisitReportId,
    pub description: &'a str,
    pub quantity: f64,
}

/// Records that can be fed to the resolver.
pub trait Identified {
    fn identity_facts(&self) -> IdentityFacts<'_>;
}

impl Identified for OriginalPart {
    fn identity_facts(&self) -> IdentityFacts<'_> {
        IdentityFacts {
            id: self.id,
            catalog_id: self.catalog_id,
            visit_report_id: self.visit_report_id,
            description: &self.description,
            quantity: self.quantity,
        }
    }
}

/// Travel legs carry no catalog id; notes and total distance stand in for
/// description and quantity.
impl Identified for OriginalDisplacement {
    fn identity_facts(&self) -> IdentityFacts<'_> {
        IdentityFacts {
            id: self.id,
            catalog_id: None,
            visit_report_id: self.visit_report_id,
            description: &self.notes,
            quantity: self.total_km(),
        }
    }
}

/// Resolve one record's origin key. Pure and total.
pub fn resolve_origin_key(facts: &IdentityFacts<'_>) -> OriginKey {
    if let Some(id) = facts.id {
        return OriginKey(format!("id:{id}"));
    }
    if let Some(catalog_id) = facts.catalog_id {
        return OriginKey(format!("catalog:{catalog_id}"));
    }
    OriginKey(format!(
        "fat:{}:{}:{}",
        facts.visit_report_id,
        facts.description.trim().to_lowercase(),
        format_quantity(facts.quantity)
    ))
}

/// Resolve keys for an aggregated, order-preserving list of originals.
pub fn resolve_all<T: Identified>(records: &[T], mode: FallbackMode) -> Vec<OriginKey> {
    let mut seen: HashMap<OriginKey, usize> = HashMap::new();

    records
        .iter()
        .map(|r| {
            let key = resolve_origin_key(&r.identity_facts());
            let counter = seen.entry(key.clone()).or_insert(0);
            let ordinal = *counter;
            *counter += 1;

            if ordinal > 0 {
                log::debug!("origin key {key} shared by {} originals", ordinal + 1);
            }

            match (mode, key.kind()) {
                (FallbackMode::Positional, OriginKeyKind::Synthesized) => {
                    OriginKey(format!("{key}#{ordinal}"))
                }
                _ => key,
            }
        })
        .collect()
}

/// `2.0` → `"2"`, `2.5` → `"2.5"`; negative zero folds to `"0"`.
fn format_quantity(q: f64) -> String {
    if q == 0.0 {
        return "0".into();
    }
    format!("{q}")
}
