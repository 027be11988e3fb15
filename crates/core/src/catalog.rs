use serde::{Deserialize, Serialize};

/// A part as published by the external parts catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPart {
    pub id: i64,
    pub code: String,
    pub description: String,
    /// Unit of measure (e.g. "un", "m", "kg").
    pub unit: String,
}
