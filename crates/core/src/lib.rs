//! `fieldrev-core`: shared data model for field-service reconciliation.
//!
//! Plain serde types only. Originals are technician-submitted and read-only;
//! nothing in this crate mutates them.

pub mod catalog;
pub mod order;

pub use catalog::CatalogPart;
pub use order::{
    OriginalDisplacement, OriginalPart, ServiceOrderId, ServiceOrderSnapshot, VisitReport,
    VisitReportId,
};
