//! `propflow-orchestrator` — runs cash-flow producers against the ledger.
//!
//! Producers implement [`CashFlowModel`]. [`CashFlowOrchestrator`] runs the
//! independent ones, resolves the aggregates dependent ones reference, runs those,
//! and commits everything atomically.

pub mod context;
pub mod error;
pub mod model;
pub mod models;
pub mod orchestrator;
pub mod result;
pub mod settings;

pub use context::AnalysisContext;
pub use error::OrchestrationError;
pub use model::{CashFlowModel, CashFlowOutput};
pub use models::{FixedSeriesModel, PercentOfAggregateModel};
pub use orchestrator::CashFlowOrchestrator;
pub use result::{AnalysisResult, OrchestrationReport};
pub use settings::{AnalysisSettings, LEDGER_BACKEND_ENV};
