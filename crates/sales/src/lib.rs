//! Sales domain module (customer orders).
//!
//! Deterministic fulfillment rules: the explicit status transition table,
//! and line/order pricing fixed at creation time (items are immutable once
//! the order exists).

pub mod order;
pub mod pricing;

pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderPatch, OrderStatus};
pub use pricing::{order_totals, price_line, tax_rate, OrderTotals, PricedLine};
