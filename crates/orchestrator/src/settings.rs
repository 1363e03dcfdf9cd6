//! Run configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use propflow_ledger::{Ledger, LedgerBackend, LedgerConfig};

/// Environment variable overriding [`AnalysisSettings::ledger_backend`].
pub const LEDGER_BACKEND_ENV: &str = "PROPFLOW_LEDGER_BACKEND";

/// Settings shared by the orchestrator and every producer of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub ledger_backend: LedgerBackend,
    pub batch_compaction_threshold: usize,
    /// Absolute tolerance for reconciliation checks.
    pub tolerance: f64,
    /// Check totals against breakdowns before committing a run.
    pub reconcile: bool,
    /// Free-form producer parameters.
    pub params: Map<String, JsonValue>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let ledger = LedgerConfig::default();
        Self {
            ledger_backend: ledger.backend,
            batch_compaction_threshold: ledger.compaction_threshold,
            tolerance: 0.01,
            reconcile: true,
            params: Map::new(),
        }
    }
}

impl AnalysisSettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PROPFLOW_LEDGER_BACKEND`; unknown values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(LEDGER_BACKEND_ENV) {
            self.ledger_backend = parse_backend(&raw, self.ledger_backend);
        }
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Typed read of a producer parameter. `Ok(None)` when it is not set.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> serde_json::Result<Option<T>> {
        self.params
            .get(name)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            backend: self.ledger_backend,
            compaction_threshold: self.batch_compaction_threshold,
        }
    }

    /// A fresh ledger on the configured backend.
    pub fn build_ledger(&self) -> Ledger {
        Ledger::from_config(&self.ledger_config())
    }
}

fn parse_backend(raw: &str, fallback: LedgerBackend) -> LedgerBackend {
    raw.parse().unwrap_or_else(|err| {
        tracing::warn!(
            value = raw,
            error = %err,
            default = fallback.as_str(),
            "{LEDGER_BACKEND_ENV} not recognised; keeping configured backend"
        );
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.ledger_backend, LedgerBackend::InMemory);
        assert_eq!(settings.batch_compaction_threshold, 64);
        assert_eq!(settings.tolerance, 0.01);
        assert!(settings.reconcile);
        assert!(settings.params.is_empty());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            AnalysisSettings::from_json(r#"{"ledger_backend":"batched","params":{"fee_rate":0.05}}"#)
                .unwrap();
        assert_eq!(settings.ledger_backend, LedgerBackend::Batched);
        assert_eq!(settings.tolerance, 0.01);
        assert_eq!(settings.param::<f64>("fee_rate").unwrap(), Some(0.05));
        assert_eq!(settings.param::<f64>("missing").unwrap(), None);
        assert!(settings.param::<String>("fee_rate").is_err());
    }

    #[test]
    fn unknown_backend_in_json_is_an_error() {
        assert!(AnalysisSettings::from_json(r#"{"ledger_backend":"postgres"}"#).is_err());
    }

    #[test]
    fn env_value_parsing_falls_back() {
        assert_eq!(parse_backend("batched", LedgerBackend::InMemory), LedgerBackend::Batched);
        assert_eq!(parse_backend("redis", LedgerBackend::InMemory), LedgerBackend::InMemory);
    }

    #[test]
    fn builds_configured_backend() {
        let settings = AnalysisSettings::default().with_param("x", json!(1));
        assert_eq!(settings.build_ledger().backend().unwrap(), "in_memory");
        let settings = AnalysisSettings {
            ledger_backend: LedgerBackend::Batched,
            ..settings
        };
        assert_eq!(settings.build_ledger().backend().unwrap(), "batched");
    }
}
