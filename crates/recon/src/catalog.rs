use std::collections::HashMap;

use fieldrev_core::CatalogPart;

use crate::error::{LookupError, ReconError};
use crate::lookup::CatalogLookupService;

/// Parts catalog held in memory, loaded from a CSV export.
///
/// Codes are unique ignoring case and surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    parts: Vec<CatalogPart>,
    by_code: HashMap<String, usize>,
}

impl InMemoryCatalog {
    pub fn new(parts: Vec<CatalogPart>) -> Result<Self, ReconError> {
        let mut by_code = HashMap::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if by_code.insert(normalize(&part.code), i).is_some() {
                return Err(ReconError::DuplicateCatalogCode(part.code.clone()));
            }
        }
        Ok(Self { parts, by_code })
    }

    /// Load from CSV with headers `id,code,description,unit` (any order,
    /// extra columns ignored).
    pub fn from_csv(csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::CatalogParse { line: 1, message: e.to_string() })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, ReconError> {
            headers.iter().position(|h| h == name).ok_or_else(|| ReconError::CatalogParse {
                line: 1,
                message: format!("missing column '{name}'"),
            })
        };

        let id_idx = idx("id")?;
        let code_idx = idx("code")?;
        let description_idx = idx("description")?;
        let unit_idx = idx("unit")?;

        let mut parts = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::CatalogParse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let id_str = record.get(id_idx).unwrap_or("");
            let id: i64 = id_str.parse().map_err(|_| ReconError::CatalogParse {
                line,
                message: format!("cannot parse id '{id_str}'"),
            })?;

            let code = record.get(code_idx).unwrap_or("").to_string();
            if code.is_empty() {
                return Err(ReconError::CatalogParse { line, message: "empty code".into() });
            }

            parts.push(CatalogPart {
                id,
                code,
                description: record.get(description_idx).unwrap_or("").to_string(),
                unit: record.get(unit_idx).unwrap_or("").to_string(),
            });
        }

        Self::new(parts)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[CatalogPart] {
        &self.parts
    }
}

impl CatalogLookupService for InMemoryCatalog {
    fn search_by_code(&self, code: &str) -> Result<Option<CatalogPart>, LookupError> {
        Ok(self.by_code.get(&normalize(code)).map(|&i| self.parts[i].clone()))
    }

    /// Every whitespace-separated token of `term` must occur in the
    /// description. Ranked: prefix match, then whole-term substring, then
    /// token match; ties by description, then code.
    fn search_by_description(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<CatalogPart>, LookupError> {
        let needle = normalize(term);
        let tokens: Vec<&str> = needle.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(u8, String, &CatalogPart)> = self
            .parts
            .iter()
            .filter_map(|p| {
                let hay = normalize(&p.description);
                if !tokens.iter().all(|t| hay.contains(t)) {
                    return None;
                }
                let rank = if hay.starts_with(&needle) {
                    0
                } else if hay.contains(&needle) {
                    1
                } else {
                    2
                };
                Some((rank, hay, p))
            })
            .collect();

        hits.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.code.cmp(&b.2.code))
        });

        Ok(hits.into_iter().take(limit).map(|(_, _, p)| p.clone()).collect())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
