//! `stockdesk-stock` — the stock ledger domain.
//!
//! One row per (product, warehouse) with an on-hand/reserved split. All
//! quantity arithmetic lives here as pure functions; the store applies the
//! results inside row-locked transactions.

pub mod level;

pub use level::{QuantityWrite, StockLevel, StockWrite};
