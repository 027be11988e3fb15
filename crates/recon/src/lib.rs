//! `fieldrev-recon`: revision reconciliation for technician visit reports.
//!
//! Takes the visit reports of one service order, resolves a stable origin
//! key for each filed displacement and part, and keeps a reviewer-owned
//! revised set alongside the read-only originals. Accepting an original is
//! idempotent per origin key; deleting an accepted row leaves a tombstone so
//! the original is not accepted again.
//!
//! Pure engine crate: callers supply the visit reports (see [`source`]) and
//! the catalog service (see [`lookup`]), and receive the final payload
//! through a [`SubmissionSink`]. No CLI dependencies.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lookup;
pub mod model;
pub mod source;
pub mod state;
pub mod store;
pub mod submission;
pub mod summary;
pub mod totals;

pub use catalog::InMemoryCatalog;
pub use config::{FallbackMode, ReconConfig};
pub use engine::{AcceptAllReport, OriginalEntry, Reconciler};
pub use error::{LookupError, ReconError, ValidationError};
pub use identity::{OriginKey, OriginKeyKind};
pub use lookup::{CatalogLookupService, LookupMode, LookupOutcome, LookupReply, LookupTicket};
pub use model::{Collection, DisplacementFields, PartFields};
pub use source::{JsonSnapshotSource, VisitReportSource};
pub use store::{AcceptOutcome, CancelOutcome, DeleteOutcome, RowId, SaveOutcome};
pub use submission::{SubmissionPayload, SubmissionSink};
pub use summary::{OriginStatus, ReconSummary};
