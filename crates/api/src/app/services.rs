//! Store wiring: one Postgres pool shared by every repository.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use stockdesk_store::{
    AuditStore, CategoryStore, CustomerStore, OrderStore, OrganizationStore, ProductStore,
    PurchaseOrderStore, StockStore, SupplierStore, WarehouseStore,
};

pub struct AppServices {
    pub organizations: OrganizationStore,
    pub categories: CategoryStore,
    pub products: ProductStore,
    pub suppliers: SupplierStore,
    pub customers: CustomerStore,
    pub warehouses: WarehouseStore,
    pub stock: StockStore,
    pub purchase_orders: PurchaseOrderStore,
    pub orders: OrderStore,
    pub audit: AuditStore,
}

/// Connect, migrate, and construct every repository.
pub async fn build_services(database_url: &str) -> anyhow::Result<AppServices> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await
        .context("failed to connect to postgres")?;

    stockdesk_store::migrate(&pool)
        .await
        .context("failed to run migrations")?;

    let audit = AuditStore::new(pool.clone());
    Ok(AppServices {
        organizations: OrganizationStore::new(pool.clone(), audit.clone()),
        categories: CategoryStore::new(pool.clone(), audit.clone()),
        products: ProductStore::new(pool.clone(), audit.clone()),
        suppliers: SupplierStore::new(pool.clone(), audit.clone()),
        customers: CustomerStore::new(pool.clone(), audit.clone()),
        warehouses: WarehouseStore::new(pool.clone(), audit.clone()),
        stock: StockStore::new(pool.clone(), audit.clone()),
        purchase_orders: PurchaseOrderStore::new(pool.clone(), audit.clone()),
        orders: OrderStore::new(pool, audit.clone()),
        audit,
    })
}
