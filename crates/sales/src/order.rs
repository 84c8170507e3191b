use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockdesk_core::{CustomerId, DomainError, DomainResult, OrderId, OrderItemId, ProductId};

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Explicit, total transition table; every pair not listed is invalid.
    pub fn can_transition_to(&self, to: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Sales order line; prices and tax are frozen at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub tax_amount: Decimal,
    pub total_price: Decimal,
}

/// Sales order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input line. `unit_price` defaults to the product's current price.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount: Decimal,
}

impl NewOrderItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        if self.unit_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(DomainError::validation(
                "item unit_price must not be negative",
            ));
        }
        if self.discount < Decimal::ZERO {
            return Err(DomainError::validation(
                "item discount must not be negative",
            ));
        }
        Ok(())
    }
}

/// Input for creating a sales order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub order_number: Option<String>,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub shipping_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order requires at least one item"));
        }
        for item in &self.items {
            item.validate()?;
        }
        if self.discount_amount < Decimal::ZERO || self.shipping_amount < Decimal::ZERO {
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

/// Partial update. Items are deliberately absent: totals are immutable once
/// the lines are set, and item edits are rejected at validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "stockdesk_core::patch::double_option")]
    pub notes: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_confirmed_allowed_but_skipping_ahead_rejected() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn cancel_allowed_until_shipped() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn refund_only_after_delivery_and_terminals_stay_terminal() {
        use OrderStatus::*;
        assert!(Delivered.can_transition_to(Refunded));
        for to in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded] {
            assert!(!Cancelled.can_transition_to(to), "cancelled -> {to}");
            assert!(!Refunded.can_transition_to(to), "refunded -> {to}");
        }
    }

    #[test]
    fn create_validation_catches_bad_lines() {
        let order = NewOrder {
            customer_id: CustomerId::new(),
            order_number: None,
            items: vec![NewOrderItem {
                product_id: ProductId::new(),
                quantity: 0,
                unit_price: None,
                discount: Decimal::ZERO,
            }],
            discount_amount: Decimal::ZERO,
            shipping_amount: Decimal::ZERO,
            notes: None,
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        use OrderStatus::*;
        for status in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
