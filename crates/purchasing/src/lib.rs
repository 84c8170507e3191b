//! Purchasing domain module (Purchase Orders).
//!
//! This crate contains business rules for the procurement lifecycle,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage): the status transition table, order/line arithmetic, and the
//! receiving plan the store applies transactionally.

pub mod order;
pub mod receive;

pub use order::{
    NewPurchaseOrder, NewPurchaseOrderItem, PurchaseOrder, PurchaseOrderItem, PurchaseOrderPatch,
    PurchaseOrderStatus,
};
pub use receive::{plan_receipt, ReceiptLine, ReceiptPlan, ReceiptRequest};
