//! `propflow-analysis` — query layer over committed ledger data.
//!
//! - [`AggregateKey`]: the closed vocabulary of financial totals
//! - [`LedgerQueries`]: snapshot-in, series-out aggregation
//! - [`reconcile`]: totals vs. breakdown consistency checks

pub mod error;
pub mod key;
pub mod legacy;
pub mod queries;
pub mod reconcile;

pub use error::{AggregateLookupError, ReconciliationError, SchemaError};
pub use key::AggregateKey;
pub use queries::{LedgerQueries, REQUIRED_FIELDS};
pub use reconcile::reconcile;
