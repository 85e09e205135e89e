//! Infrastructure layer: SQLite storage, the product registry, the movement
//! ledger and the consistency engine that keeps them in step.
//!
//! - [`registry`] / [`ledger`]: single-table access on an explicit connection.
//! - [`engine`]: compound, transactional operations (the only combined writes).
//! - [`StockLedger`]: pool-backed facade, one scoped connection per call.
//! - [`reports`]: read-only aggregation for display.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod reports;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use engine::StockDiscrepancy;
pub use error::{LedgerError, LedgerResult};
pub use reports::StockReport;
pub use service::StockLedger;
