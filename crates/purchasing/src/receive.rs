//! Receiving: turning "goods arrived" input into a per-line application
//! plan plus the resulting order status.
//!
//! The plan is computed purely so the store can apply it as one
//! all-or-nothing transaction (line updates, stock upserts, status write).

use std::collections::HashMap;

use serde::Deserialize;

use stockdesk_core::{DomainError, DomainResult, ProductId, PurchaseOrderItemId};

use crate::order::{PurchaseOrderItem, PurchaseOrderStatus};

/// Caller-requested receipt for one line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReceiptRequest {
    pub item_id: PurchaseOrderItemId,
    pub received_qty: i64,
}

/// One line of the computed plan; `quantity` is already clamped to the
/// line's outstanding remainder and is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLine {
    pub item_id: PurchaseOrderItemId,
    pub product_id: ProductId,
    pub quantity: i64,
}

/// The full receipt to apply in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPlan {
    pub lines: Vec<ReceiptLine>,
    pub status_after: PurchaseOrderStatus,
    pub fully_received: bool,
}

/// Compute the receipt plan for an order.
///
/// `requested = None` receives the full remainder of every line. Requested
/// quantities are clamped to each line's remainder; lines that end up at
/// zero are skipped, which makes re-receiving an already-full line a no-op.
pub fn plan_receipt(
    status: PurchaseOrderStatus,
    items: &[PurchaseOrderItem],
    requested: Option<&[ReceiptRequest]>,
) -> DomainResult<ReceiptPlan> {
    if !status.is_receivable() {
        return Err(DomainError::invalid_state(status.as_str(), "receive goods"));
    }

    let wanted: Option<HashMap<PurchaseOrderItemId, i64>> = match requested {
        None => None,
        Some(reqs) => {
            let mut map = HashMap::with_capacity(reqs.len());
            for req in reqs {
                if req.received_qty < 0 {
                    return Err(DomainError::validation(
                        "received_qty must not be negative",
                    ));
                }
                if !items.iter().any(|i| i.id == req.item_id) {
                    return Err(DomainError::not_found("purchase order item"));
                }
                map.insert(req.item_id, req.received_qty);
            }
            Some(map)
        }
    };

    let mut lines = Vec::new();
    let mut all_full = true;
    let mut any_received = false;

    for item in items {
        let want = match &wanted {
            None => item.remaining(),
            Some(map) => map.get(&item.id).copied().unwrap_or(0),
        };
        let quantity = want.min(item.remaining());
        if quantity > 0 {
            lines.push(ReceiptLine {
                item_id: item.id,
                product_id: item.product_id,
                quantity,
            });
        }

        let received_after = item.received_qty + quantity.max(0);
        if received_after < item.quantity {
            all_full = false;
        }
        if received_after > 0 {
            any_received = true;
        }
    }

    let status_after = if all_full {
        PurchaseOrderStatus::Received
    } else if any_received {
        PurchaseOrderStatus::Partial
    } else {
        status
    };

    Ok(ReceiptPlan {
        lines,
        status_after,
        fully_received: all_full,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(quantity: i64, received_qty: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: PurchaseOrderItemId::new(),
            product_id: ProductId::new(),
            quantity,
            unit_price: Decimal::new(500, 2),
            received_qty,
        }
    }

    #[test]
    fn default_receives_full_remainder_of_every_line() {
        let items = vec![item(10, 0), item(4, 1)];
        let plan = plan_receipt(PurchaseOrderStatus::Ordered, &items, None).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].quantity, 10);
        assert_eq!(plan.lines[1].quantity, 3);
        assert_eq!(plan.status_after, PurchaseOrderStatus::Received);
        assert!(plan.fully_received);
    }

    #[test]
    fn partial_then_remainder_reaches_received() {
        // Scenario: quantity 10, receive 4 first, then the remaining 6.
        let items = vec![item(10, 0)];
        let req = [ReceiptRequest {
            item_id: items[0].id,
            received_qty: 4,
        }];
        let plan = plan_receipt(PurchaseOrderStatus::Ordered, &items, Some(&req)).unwrap();
        assert_eq!(plan.lines, vec![ReceiptLine {
            item_id: items[0].id,
            product_id: items[0].product_id,
            quantity: 4,
        }]);
        assert_eq!(plan.status_after, PurchaseOrderStatus::Partial);
        assert!(!plan.fully_received);

        let items = vec![item(10, 4)];
        let plan = plan_receipt(PurchaseOrderStatus::Partial, &items, None).unwrap();
        assert_eq!(plan.lines[0].quantity, 6);
        assert_eq!(plan.status_after, PurchaseOrderStatus::Received);
    }

    #[test]
    fn over_receipt_is_clamped_to_remainder() {
        let items = vec![item(10, 7)];
        let req = [ReceiptRequest {
            item_id: items[0].id,
            received_qty: 99,
        }];
        let plan = plan_receipt(PurchaseOrderStatus::Partial, &items, Some(&req)).unwrap();
        assert_eq!(plan.lines[0].quantity, 3);
        assert_eq!(plan.status_after, PurchaseOrderStatus::Received);
    }

    #[test]
    fn re_receiving_a_full_line_is_a_no_op() {
        let full = item(5, 5);
        let open = item(8, 2);
        let req = [ReceiptRequest {
            item_id: full.id,
            received_qty: 5,
        }];
        let items = vec![full, open];
        let plan = plan_receipt(PurchaseOrderStatus::Partial, &items, Some(&req)).unwrap();

        // Clamped to zero: no stock movement, status unchanged.
        assert!(plan.lines.is_empty());
        assert_eq!(plan.status_after, PurchaseOrderStatus::Partial);
    }

    #[test]
    fn receive_outside_ordered_or_partial_fails() {
        let items = vec![item(1, 0)];
        for status in [
            PurchaseOrderStatus::Draft,
            PurchaseOrderStatus::Pending,
            PurchaseOrderStatus::Received,
            PurchaseOrderStatus::Cancelled,
        ] {
            let err = plan_receipt(status, &items, None).unwrap_err();
            assert!(matches!(err, DomainError::InvalidState { .. }), "{status}");
        }
    }

    #[test]
    fn unknown_item_id_rejected() {
        let items = vec![item(1, 0)];
        let req = [ReceiptRequest {
            item_id: PurchaseOrderItemId::new(),
            received_qty: 1,
        }];
        let err = plan_receipt(PurchaseOrderStatus::Ordered, &items, Some(&req)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_items() -> impl Strategy<Value = Vec<PurchaseOrderItem>> {
            proptest::collection::vec((1i64..100, 0i64..100), 1..6).prop_map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(quantity, received)| PurchaseOrderItem {
                        id: PurchaseOrderItemId::new(),
                        product_id: ProductId::new(),
                        quantity,
                        unit_price: Decimal::new(100, 2),
                        received_qty: received.min(quantity),
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn planned_lines_stay_within_the_outstanding_remainder(
                items in arb_items(),
                wants in proptest::collection::vec(0i64..200, 6),
            ) {
                let reqs: Vec<ReceiptRequest> = items
                    .iter()
                    .zip(&wants)
                    .map(|(item, &want)| ReceiptRequest {
                        item_id: item.id,
                        received_qty: want,
                    })
                    .collect();
                let plan =
                    plan_receipt(PurchaseOrderStatus::Ordered, &items, Some(&reqs)).unwrap();

                for line in &plan.lines {
                    let item = items.iter().find(|i| i.id == line.item_id).unwrap();
                    prop_assert!(line.quantity > 0);
                    prop_assert!(line.quantity <= item.remaining());
                }

                let all_full = items.iter().all(|item| {
                    let got = plan
                        .lines
                        .iter()
                        .find(|l| l.item_id == item.id)
                        .map_or(0, |l| l.quantity);
                    item.received_qty + got == item.quantity
                });
                prop_assert_eq!(plan.fully_received, all_full);
                prop_assert_eq!(
                    plan.status_after == PurchaseOrderStatus::Received,
                    all_full
                );
            }
        }
    }
}
