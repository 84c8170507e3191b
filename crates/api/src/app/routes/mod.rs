use axum::Router;

pub mod audit_logs;
pub mod categories;
pub mod common;
pub mod customers;
pub mod orders;
pub mod organizations;
pub mod products;
pub mod purchase_orders;
pub mod stock;
pub mod suppliers;
pub mod system;
pub mod warehouses;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/organizations", organizations::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/customers", customers::router())
        .nest("/warehouses", warehouses::router())
        .nest("/stock", stock::router())
        .nest("/purchase-orders", purchase_orders::router())
        .nest("/orders", orders::router())
        .nest("/audit-logs", audit_logs::router())
}
