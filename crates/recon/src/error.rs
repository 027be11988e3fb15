use std::fmt;

use crate::model::Collection;
use crate::store::RowId;

/// Engine errors. All of them are local and recoverable; none of them
/// leaves the store in a half-applied state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (out-of-range threshold, etc.).
    ConfigValidation(String),
    /// IO error (file read, etc.).
    Io(String),
    /// Visit report source could not produce a snapshot.
    Source(String),
    /// Row id does not exist in the store (never issued, or a cancelled draft).
    UnknownRow(RowId),
    /// Original index out of range for its collection.
    UnknownOriginal { collection: Collection, index: usize },
    /// Lifecycle operation not permitted from the row's current state.
    InvalidTransition { row: RowId, state: &'static str, op: &'static str },
    /// Field edits require the row to be in an editing state.
    NotEditing(RowId),
    /// Field is derived from the catalog on this row.
    FieldReadOnly { row: RowId, field: &'static str },
    /// Suggestion index out of range for the row's last fuzzy result.
    NoSuchSuggestion { row: RowId, index: usize },
    /// Two catalog entries share a code.
    DuplicateCatalogCode(String),
    /// Catalog file could not be parsed.
    CatalogParse { line: u64, message: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Source(msg) => write!(f, "visit report source: {msg}"),
            Self::UnknownRow(row) => write!(f, "unknown row: {row}"),
            Self::UnknownOriginal { collection, index } => {
                write!(f, "no original {collection} at index {index}")
            }
            Self::InvalidTransition { row, state, op } => {
                write!(f, "row {row}: cannot {op} while {state}")
            }
            Self::NotEditing(row) => write!(f, "row {row} is not being edited"),
            Self::FieldReadOnly { row, field } => {
                write!(f, "row {row}: '{field}' is derived from the catalog")
            }
            Self::NoSuchSuggestion { row, index } => {
                write!(f, "row {row}: no catalog suggestion at index {index}")
            }
            Self::DuplicateCatalogCode(code) => write!(f, "duplicate catalog code '{code}'"),
            Self::CatalogParse { line, message } => {
                write!(f, "catalog line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ReconError {}

/// Blocking field validation on Save. The row stays in Editing.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyPartCode,
    InvalidQuantity(f64),
    NegativeUnitPrice(i64),
    NegativeDistance,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPartCode => write!(f, "part code is required"),
            Self::InvalidQuantity(q) => write!(f, "quantity must be a non-negative number, got {q}"),
            Self::NegativeUnitPrice(cents) => {
                write!(f, "unit price cannot be negative ({})", crate::totals::format_cents(*cents))
            }
            Self::NegativeDistance => write!(f, "distances must be non-negative numbers"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Transient failure talking to the parts catalog. Row-scoped and advisory;
/// retried only when the user triggers the search again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Network(String),
    Service(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "catalog unreachable: {msg}"),
            Self::Service(msg) => write!(f, "catalog error: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}
