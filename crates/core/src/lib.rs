//! `propflow-core` — data model shared by the ledger, query and orchestration crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod period;
pub mod record;
pub mod series;

pub use error::{DomainError, DomainResult};
pub use id::{AssetId, DealId, EntityId, SourceId, TransactionId};
pub use period::{Period, Timeline};
pub use record::{
    CashFlowCategory, EntityType, FlowPurpose, PassNumber, SeriesMetadata, Subcategory,
    TransactionRecord,
};
pub use series::{BreakdownTable, Series};
