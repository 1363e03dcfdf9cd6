use thiserror::Error;

use propflow_analysis::{AggregateLookupError, ReconciliationError, SchemaError};
use propflow_ledger::LedgerError;

/// Why a cash-flow run aborted.
///
/// Every variant is returned after the run's ledger transaction has been rolled
/// back, so none of them leaves partial output behind.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// `compute_cf` failed. `source` is the producer's error, unmodified.
    #[error("producer '{model}' failed: {source}")]
    Producer {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// A producer asked for an aggregate that is unknown or not resolved yet.
    #[error("producer '{model}' looked up an aggregate it cannot see: {source}")]
    AggregateLookup {
        model: String,
        #[source]
        source: AggregateLookupError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}

impl OrchestrationError {
    /// Classify a producer failure, surfacing lookup errors as their own variant.
    pub fn from_producer(model: impl Into<String>, source: anyhow::Error) -> Self {
        let model = model.into();
        match source.downcast::<AggregateLookupError>() {
            Ok(source) => OrchestrationError::AggregateLookup { model, source },
            Err(source) => OrchestrationError::Producer { model, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propflow_analysis::AggregateKey;

    #[test]
    fn lookup_errors_are_surfaced_by_kind() {
        let err = OrchestrationError::from_producer(
            "Management Fee",
            anyhow::Error::new(AggregateLookupError::NotResolved(AggregateKey::EffectiveGrossIncome)),
        );
        assert!(matches!(
            err,
            OrchestrationError::AggregateLookup {
                source: AggregateLookupError::NotResolved(AggregateKey::EffectiveGrossIncome),
                ..
            }
        ));
    }

    #[test]
    fn other_errors_keep_their_source() {
        let err = OrchestrationError::from_producer("Rent Roll", anyhow::anyhow!("rent roll is empty"));
        match err {
            OrchestrationError::Producer { model, source } => {
                assert_eq!(model, "Rent Roll");
                assert_eq!(source.to_string(), "rent roll is empty");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
