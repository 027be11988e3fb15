use serde::{Deserialize, Serialize};

pub type ServiceOrderId = i64;
pub type VisitReportId = i64;

// ---------------------------------------------------------------------------
// Service order snapshot
// ---------------------------------------------------------------------------

/// Read-only snapshot of a service order as handed over by the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrderSnapshot {
    pub order_id: ServiceOrderId,
    #[serde(default)]
    pub visit_reports: Vec<VisitReport>,
}

/// One technician visit under a service order.
///
/// Sub-collections are optional: older reports carry neither travel nor
/// parts, and a missing collection is not the same as an empty one on the
/// wire, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisitReport {
    pub id: VisitReportId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    /// ISO-8601 date of the visit, as filed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displacements: Option<Vec<OriginalDisplacement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<OriginalPart>>,
}

impl VisitReport {
    pub fn displacements(&self) -> &[OriginalDisplacement] {
        self.displacements.as_deref().unwrap_or(&[])
    }

    pub fn parts(&self) -> &[OriginalPart] {
        self.parts.as_deref().unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Original records
// ---------------------------------------------------------------------------

/// A travel leg filed by a technician.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OriginalDisplacement {
    #[serde(default)]
    pub id: Option<i64>,
    /// Owning visit report. Stamped during aggregation; nested records on
    /// the wire usually omit it.
    #[serde(default)]
    pub visit_report_id: VisitReportId,
    #[serde(default)]
    pub outbound_km: f64,
    #[serde(default)]
    pub return_km: f64,
    #[serde(default)]
    pub outbound_minutes: u32,
    #[serde(default)]
    pub return_minutes: u32,
    #[serde(default)]
    pub notes: String,
}

impl OriginalDisplacement {
    pub fn total_km(&self) -> f64 {
        self.outbound_km + self.return_km
    }
}

/// A consumed part filed by a technician.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OriginalPart {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub catalog_id: Option<i64>,
    #[serde(default)]
    pub visit_report_id: VisitReportId,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    /// Unit of measure, free text as typed in the field.
    #[serde(default)]
    pub unit: String,
}
