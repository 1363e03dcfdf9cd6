//! Backend selection.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use propflow_core::DomainError;

/// Which [`LedgerStore`](crate::store::LedgerStore) implementation backs a ledger.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    #[default]
    InMemory,
    Batched,
}

impl LedgerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerBackend::InMemory => "in_memory",
            LedgerBackend::Batched => "batched",
        }
    }
}

impl FromStr for LedgerBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "in-memory" | "memory" => Ok(LedgerBackend::InMemory),
            "batched" | "bulk" => Ok(LedgerBackend::Batched),
            other => Err(DomainError::validation(format!(
                "unknown ledger backend '{other}' (expected 'in_memory' or 'batched')"
            ))),
        }
    }
}

/// Ledger construction settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// Batched backend only: merge chunks once more than this many accumulate.
    pub compaction_threshold: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::InMemory,
            compaction_threshold: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_common_spellings() {
        assert_eq!("batched".parse::<LedgerBackend>().unwrap(), LedgerBackend::Batched);
        assert_eq!("In-Memory".parse::<LedgerBackend>().unwrap(), LedgerBackend::InMemory);
        assert!("sqlite".parse::<LedgerBackend>().is_err());
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{"backend":"batched"}"#).unwrap();
        assert_eq!(cfg.backend, LedgerBackend::Batched);
        assert_eq!(cfg.compaction_threshold, 64);
    }
}
