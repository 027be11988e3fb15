use std::time::Duration;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

// ---------------------------------------------------------------------------
// Catalog lookup
// ---------------------------------------------------------------------------

/// Thresholds for the two catalog search modes.
///
/// Code searches are explicit (user asks), so only the length gate applies.
/// Description searches fire while typing, so they also wait out
/// `debounce_ms` of inactivity before dispatching.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_min_code_length")]
    pub min_code_length: usize,
    #[serde(default = "default_min_description_length")]
    pub min_description_length: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_min_code_length() -> usize {
    3
}

fn default_min_description_length() -> usize {
    3
}

fn default_debounce_ms() -> u64 {
    350
}

fn default_result_limit() -> usize {
    10
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            min_code_length: default_min_code_length(),
            min_description_length: default_min_description_length(),
            debounce_ms: default_debounce_ms(),
            result_limit: default_result_limit(),
        }
    }
}

impl LookupConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub fallback: FallbackMode,
}

/// How synthesized (`fat:`) origin keys treat look-alike originals.
///
/// `Shared`: two originals in one visit report with the same description and
/// quantity resolve to the same key, so accepting one blocks the other.
/// `Positional`: the occurrence ordinal is appended (`#0`, `#1`, ...) so they
/// stay distinct, at the price of depending on snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    #[default]
    Shared,
    Positional,
}

impl std::fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Positional => write!(f, "positional"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

const MAX_RESULT_LIMIT: usize = 100;
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let l = &self.lookup;

        if l.result_limit == 0 || l.result_limit > MAX_RESULT_LIMIT {
            return Err(ReconError::ConfigValidation(format!(
                "lookup.result_limit must be between 1 and {MAX_RESULT_LIMIT}, got {}",
                l.result_limit
            )));
        }

        if l.min_code_length == 0 {
            return Err(ReconError::ConfigValidation(
                "lookup.min_code_length must be at least 1".into(),
            ));
        }

        if l.min_description_length == 0 {
            return Err(ReconError::ConfigValidation(
                "lookup.min_description_length must be at least 1".into(),
            ));
        }

        if l.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ReconError::ConfigValidation(format!(
                "lookup.debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                l.debounce_ms
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
