//! `stockdesk-store` — Postgres persistence.
//!
//! One repository per entity over a shared `PgPool`. Multi-row operations
//! that must be atomic (purchase order receiving, bulk stock writes) run
//! inside a single transaction; everything else relies on the schema's
//! unique and check constraints as the backstop for concurrent requests.
//!
//! ## Tenant note
//!
//! Repositories take the pool by value (`PgPool` is an `Arc` internally)
//! and are constructed once in the binary, then passed down — there is no
//! process-global connection singleton.

pub mod audit;
pub mod categories;
pub mod customers;
pub mod error;
pub mod orders;
pub mod organizations;
pub mod products;
pub mod purchase_orders;
pub mod stock;
pub mod suppliers;
pub mod warehouses;

pub use audit::{AuditFilter, AuditStore};
pub use categories::CategoryStore;
pub use customers::CustomerStore;
pub use orders::{OrderFilter, OrderStore, OrderWithItems};
pub use organizations::OrganizationStore;
pub use products::{ProductFilter, ProductStore};
pub use purchase_orders::{PurchaseOrderFilter, PurchaseOrderStore, PurchaseOrderWithItems};
pub use stock::{BulkStockResult, BulkStockWrite, StockFilter, StockRecord, StockStore};
pub use suppliers::SupplierStore;
pub use warehouses::WarehouseStore;

use sqlx::PgPool;
use stockdesk_core::{DomainError, DomainResult};

/// Highest page size served by the catalog and order listings.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> DomainResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::storage(format!("migrate: {e}")))
}
