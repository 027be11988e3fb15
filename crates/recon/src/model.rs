use fieldrev_core::{CatalogPart, OriginalDisplacement, OriginalPart, VisitReportId};
use serde::Serialize;

use crate::error::ValidationError;
use crate::totals::line_total_cents;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The two sub-record collections carried by a visit report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Displacements,
    Parts,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Displacements => write!(f, "displacement"),
            Self::Parts => write!(f, "part"),
        }
    }
}

/// Business fields of a revised row. Implemented by both row kinds so the
/// store and the state machine stay generic.
pub trait RevisedFields: Clone + PartialEq + std::fmt::Debug {
    /// Required-field check run on Save.
    fn validate(&self) -> Result<(), ValidationError>;
}

// ---------------------------------------------------------------------------
// Displacement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DisplacementFields {
    /// `None` for rows added by the reviewer.
    pub visit_report_id: Option<VisitReportId>,
    pub outbound_km: f64,
    pub return_km: f64,
    pub outbound_minutes: u32,
    pub return_minutes: u32,
    pub notes: String,
}

impl DisplacementFields {
    pub fn total_km(&self) -> f64 {
        self.outbound_km + self.return_km
    }

    pub fn total_minutes(&self) -> u64 {
        u64::from(self.outbound_minutes) + u64::from(self.return_minutes)
    }
}

impl From<&OriginalDisplacement> for DisplacementFields {
    fn from(o: &OriginalDisplacement) -> Self {
        Self {
            visit_report_id: Some(o.visit_report_id),
            outbound_km: o.outbound_km,
            return_km: o.return_km,
            outbound_minutes: o.outbound_minutes,
            return_minutes: o.return_minutes,
            notes: o.notes.clone(),
        }
    }
}

impl RevisedFields for DisplacementFields {
    fn validate(&self) -> Result<(), ValidationError> {
        let distance_ok = |km: f64| km.is_finite() && km >= 0.0;
        if !distance_ok(self.outbound_km) || !distance_ok(self.return_km) {
            return Err(ValidationError::NegativeDistance);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A revised consumed-part row.
///
/// `total_cents` is stored, not derived at render time, and always equals
/// `round(quantity * unit_price_cents)`: the two factors are only writable
/// through setters that recompute it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PartFields {
    pub visit_report_id: Option<VisitReportId>,
    /// Set when the row was populated from the parts catalog.
    pub catalog_id: Option<i64>,
    pub code: String,
    pub description: String,
    /// Unit of measure. Read-only while `catalog_id` is set.
    pub unit: String,
    quantity: f64,
    unit_price_cents: i64,
    total_cents: i64,
}

impl PartFields {
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = quantity;
        self.recompute_total();
    }

    pub fn set_unit_price_cents(&mut self, cents: i64) {
        self.unit_price_cents = cents;
        self.recompute_total();
    }

    pub fn is_catalog_linked(&self) -> bool {
        self.catalog_id.is_some()
    }

    /// Copy code, description and unit from a catalog entry and link the row.
    pub fn apply_catalog(&mut self, part: &CatalogPart) {
        self.catalog_id = Some(part.id);
        self.code = part.code.clone();
        self.description = part.description.clone();
        self.unit = part.unit.clone();
    }

    fn recompute_total(&mut self) {
        self.total_cents = line_total_cents(self.quantity, self.unit_price_cents);
    }
}

impl From<&OriginalPart> for PartFields {
    fn from(o: &OriginalPart) -> Self {
        let mut fields = Self {
            visit_report_id: Some(o.visit_report_id),
            catalog_id: o.catalog_id,
            code: o.code.clone().unwrap_or_default(),
            description: o.description.clone(),
            unit: o.unit.clone(),
            quantity: o.quantity,
            unit_price_cents: 0,
            total_cents: 0,
        };
        fields.recompute_total();
        fields
    }
}

impl RevisedFields for PartFields {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyPartCode);
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(ValidationError::InvalidQuantity(self.quantity));
        }
        if self.unit_price_cents < 0 {
            return Err(ValidationError::NegativeUnitPrice(self.unit_price_cents));
        }
        Ok(())
    }
}
