//! `stockdesk-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod identity;
pub mod order_number;
pub mod page;
pub mod patch;

pub use error::{DomainError, DomainResult};
pub use id::{
    AuditLogId, CategoryId, CustomerId, OrderId, OrderItemId, OrganizationId, ProductId,
    PurchaseOrderId, PurchaseOrderItemId, StockItemId, SupplierId, UserId, WarehouseId,
};
pub use identity::Identity;
pub use page::{Page, PageQuery};
