//! `propflow-ledger` — append-only, transactional record store.
//!
//! The ledger is the only shared mutable resource of a run. Every write goes
//! through it; every aggregate is computed from a [`LedgerSnapshot`] of it.

pub mod config;
pub mod error;
pub mod ledger;
pub mod snapshot;
pub mod store;

pub use config::{LedgerBackend, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, Transaction};
pub use snapshot::{LedgerSnapshot, LedgerStats};
pub use store::{BatchedStore, InMemoryStore, LedgerStore};
