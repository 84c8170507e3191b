use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockdesk_core::{
    DomainError, DomainResult, ProductId, PurchaseOrderId, PurchaseOrderItemId, SupplierId,
};

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Ordered,
    Partial,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Ordered => "ordered",
            Self::Partial => "partial",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }

    /// Total transition table; every pair not listed is invalid.
    ///
    /// `partial -> partial` is listed so repeated partial receipts are not
    /// transition errors. `received` and `cancelled` are terminal.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, to),
            (Draft, Pending)
                | (Draft, Ordered)
                | (Draft, Cancelled)
                | (Pending, Ordered)
                | (Pending, Cancelled)
                | (Ordered, Partial)
                | (Ordered, Received)
                | (Ordered, Cancelled)
                | (Partial, Partial)
                | (Partial, Received)
                | (Partial, Cancelled)
        )
    }

    /// Whether item lists and amounts may still change.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Whether goods may be received in this status.
    pub fn is_receivable(&self) -> bool {
        matches!(self, Self::Ordered | Self::Partial)
    }

    /// Only `partial` and `received` are written by the receive operation;
    /// callers may not request them directly.
    pub fn is_receipt_driven(&self) -> bool {
        matches!(self, Self::Partial | Self::Received)
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "ordered" => Ok(Self::Ordered),
            "partial" => Ok(Self::Partial),
            "received" => Ok(Self::Received),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status: {other}"
            ))),
        }
    }
}

/// Purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrderItem {
    pub id: PurchaseOrderItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub received_qty: i64,
}

impl PurchaseOrderItem {
    pub fn total_price(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Quantity still outstanding.
    pub fn remaining(&self) -> i64 {
        self.quantity - self.received_qty
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_qty >= self.quantity
    }
}

/// Header of a purchase order; lines are owned exclusively by the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub order_number: String,
    pub supplier_id: SupplierId,
    pub status: PurchaseOrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input line for create/replace.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl NewPurchaseOrderItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::validation(
                "item unit_price must not be negative",
            ));
        }
        Ok(())
    }

    pub fn total_price(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Input for creating a purchase order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub order_number: Option<String>,
    pub items: Vec<NewPurchaseOrderItem>,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub shipping_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPurchaseOrder {
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation(
                "purchase order requires at least one item",
            ));
        }
        for item in &self.items {
            item.validate()?;
        }
        if self.tax_amount < Decimal::ZERO || self.shipping_amount < Decimal::ZERO {
            return Err(DomainError::validation("amounts must not be negative"));
        }
        if let Some(number) = &self.order_number {
            if number.trim().is_empty() {
                return Err(DomainError::validation("order_number must not be empty"));
            }
        }
        Ok(())
    }
}

/// Partial update. Item replacement drops and recreates every line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderPatch {
    pub status: Option<PurchaseOrderStatus>,
    pub items: Option<Vec<NewPurchaseOrderItem>>,
    pub tax_amount: Option<Decimal>,
    pub shipping_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub notes: Option<Option<String>>,
}

impl PurchaseOrderPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(items) = &self.items {
            if items.is_empty() {
                return Err(DomainError::validation(
                    "purchase order requires at least one item",
                ));
            }
            for item in items {
                item.validate()?;
            }
        }
        if self.tax_amount.is_some_and(|a| a < Decimal::ZERO)
            || self.shipping_amount.is_some_and(|a| a < Decimal::ZERO)
        {
            return Err(DomainError::validation("amounts must not be negative"));
        }
        Ok(())
    }

    /// Whether the patch touches anything besides the status.
    pub fn touches_editable_fields(&self) -> bool {
        self.items.is_some()
            || self.tax_amount.is_some()
            || self.shipping_amount.is_some()
            || self.notes.is_some()
    }
}

/// `subtotal = Σ quantity × unit_price` over input lines.
pub fn subtotal(items: &[NewPurchaseOrderItem]) -> Decimal {
    items.iter().map(NewPurchaseOrderItem::total_price).sum()
}

/// `total = subtotal + tax + shipping`.
pub fn total_amount(subtotal: Decimal, tax_amount: Decimal, shipping_amount: Decimal) -> Decimal {
    subtotal + tax_amount + shipping_amount
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_price: Decimal) -> NewPurchaseOrderItem {
        NewPurchaseOrderItem {
            product_id: ProductId::new(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn transition_table_is_total() {
        use PurchaseOrderStatus::*;
        let all = [Draft, Pending, Ordered, Partial, Received, Cancelled];

        // Terminal states allow nothing.
        for to in all {
            assert!(!Received.can_transition_to(to), "received -> {to}");
            assert!(!Cancelled.can_transition_to(to), "cancelled -> {to}");
        }

        assert!(Draft.can_transition_to(Pending));
        assert!(Draft.can_transition_to(Ordered));
        assert!(Pending.can_transition_to(Ordered));
        assert!(Ordered.can_transition_to(Partial));
        assert!(Partial.can_transition_to(Received));
        assert!(Partial.can_transition_to(Partial));

        // Every pre-received state can cancel.
        for from in [Draft, Pending, Ordered, Partial] {
            assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
        }

        // No skipping backwards.
        assert!(!Ordered.can_transition_to(Draft));
        assert!(!Partial.can_transition_to(Ordered));
        assert!(!Pending.can_transition_to(Received));
    }

    #[test]
    fn create_requires_items_and_positive_quantities() {
        let order = NewPurchaseOrder {
            supplier_id: SupplierId::new(),
            order_number: None,
            items: vec![],
            tax_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            notes: None,
        };
        assert!(order.validate().is_err());

        let order = NewPurchaseOrder {
            supplier_id: SupplierId::new(),
            order_number: None,
            items: vec![item(0, Decimal::ONE)],
            tax_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            notes: None,
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn totals_follow_the_formula() {
        // 10 × 5.00 = 50.00
        let items = vec![item(10, Decimal::new(500, 2))];
        let sub = subtotal(&items);
        assert_eq!(sub, Decimal::new(5000, 2));
        assert_eq!(
            total_amount(sub, Decimal::ZERO, Decimal::ZERO),
            Decimal::new(5000, 2)
        );
        assert_eq!(
            total_amount(sub, Decimal::new(250, 2), Decimal::new(1000, 2)),
            Decimal::new(6250, 2)
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        use PurchaseOrderStatus::*;
        for status in [Draft, Pending, Ordered, Partial, Received, Cancelled] {
            assert_eq!(status.as_str().parse::<PurchaseOrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<PurchaseOrderStatus>().is_err());
    }
}
