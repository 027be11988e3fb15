use serde::Serialize;

use crate::model::{DisplacementFields, PartFields};
use crate::store::RevisionStore;

/// Line total in minor units: `round(quantity × unit_price_cents)`.
pub fn line_total_cents(quantity: f64, unit_price_cents: i64) -> i64 {
    let total = quantity * unit_price_cents as f64;
    if total.is_finite() {
        total.round() as i64
    } else {
        0
    }
}

/// `3750` → `"37.50"`, `-105` → `"-1.05"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Aggregate view over live (non-deleted) displacement rows. Computed on
/// demand, never stored per row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DisplacementTotals {
    pub legs: usize,
    pub outbound_km: f64,
    pub return_km: f64,
    pub total_km: f64,
    pub total_minutes: u64,
}

pub fn displacement_totals(store: &RevisionStore<DisplacementFields>) -> DisplacementTotals {
    store.live().fold(DisplacementTotals::default(), |mut acc, row| {
        let f = row.fields();
        acc.legs += 1;
        acc.outbound_km += f.outbound_km;
        acc.return_km += f.return_km;
        acc.total_km += f.total_km();
        acc.total_minutes = acc.total_minutes.saturating_add(f.total_minutes());
        acc
    })
}

/// Sum of stored part totals across live rows, saturating at the `i64` bounds.
pub fn parts_total_cents(store: &RevisionStore<PartFields>) -> i64 {
    store
        .live()
        .fold(0i64, |acc, row| acc.saturating_add(row.fields().total_cents()))
}
