use chrono::{DateTime, Utc};
use serde::Serialize;

use stockdesk_core::{DomainError, DomainResult};

/// Quantity state of one (product, warehouse) ledger row.
///
/// Invariant: `0 <= reserved_qty <= quantity`; `available()` is always the
/// difference and is never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub quantity: i64,
    pub reserved_qty: i64,
    pub last_count_at: Option<DateTime<Utc>>,
}

impl StockLevel {
    /// The zero-record returned for rows that do not exist yet.
    pub fn zero() -> Self {
        Self {
            quantity: 0,
            reserved_qty: 0,
            last_count_at: None,
        }
    }

    pub fn available(&self) -> i64 {
        self.quantity - self.reserved_qty
    }
}

/// Absolute vs. relative quantity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityWrite {
    /// Replace the quantity (clamped at zero).
    Set(i64),
    /// Add a signed delta to the current quantity (result clamped at zero).
    Adjust(i64),
}

/// One requested ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockWrite {
    pub quantity: QuantityWrite,
    /// New reserved quantity; absent leaves the current reservation.
    pub reserved_qty: Option<i64>,
    /// Physical inventory count (stamps `last_count_at`) vs. routine
    /// adjustment.
    pub is_count: bool,
}

impl StockWrite {
    /// Apply the write to `current`, producing the next level.
    ///
    /// Quantity clamps at zero in both modes. The resulting reservation may
    /// never exceed the resulting quantity.
    pub fn apply(&self, current: &StockLevel, now: DateTime<Utc>) -> DomainResult<StockLevel> {
        let quantity = match self.quantity {
            QuantityWrite::Set(q) => q.max(0),
            QuantityWrite::Adjust(delta) => current.quantity.saturating_add(delta).max(0),
        };

        let reserved_qty = self.reserved_qty.unwrap_or(current.reserved_qty);
        if reserved_qty < 0 {
            return Err(DomainError::validation("reserved_qty must not be negative"));
        }
        if reserved_qty > quantity {
            return Err(DomainError::validation(format!(
                "reserved_qty {reserved_qty} exceeds quantity {quantity}"
            )));
        }

        Ok(StockLevel {
            quantity,
            reserved_qty,
            last_count_at: if self.is_count {
                Some(now)
            } else {
                current.last_count_at
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(quantity: i64, reserved_qty: i64) -> StockLevel {
        StockLevel {
            quantity,
            reserved_qty,
            last_count_at: None,
        }
    }

    #[test]
    fn absolute_write_replaces_quantity() {
        let write = StockWrite {
            quantity: QuantityWrite::Set(12),
            reserved_qty: None,
            is_count: false,
        };
        let next = write.apply(&level(5, 2), Utc::now()).unwrap();
        assert_eq!(next.quantity, 12);
        assert_eq!(next.reserved_qty, 2);
        assert_eq!(next.available(), 10);
    }

    #[test]
    fn negative_adjustment_clamps_at_zero() {
        let write = StockWrite {
            quantity: QuantityWrite::Adjust(-20),
            reserved_qty: Some(0),
            is_count: false,
        };
        let next = write.apply(&level(5, 0), Utc::now()).unwrap();
        assert_eq!(next.quantity, 0);
        assert_eq!(next.available(), 0);
    }

    #[test]
    fn reserving_more_than_on_hand_fails() {
        // quantity stays 5; reserving 10 must fail.
        let write = StockWrite {
            quantity: QuantityWrite::Adjust(0),
            reserved_qty: Some(10),
            is_count: false,
        };
        let err = write.apply(&level(5, 0), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn carried_reservation_exceeding_new_quantity_fails() {
        let write = StockWrite {
            quantity: QuantityWrite::Set(1),
            reserved_qty: None,
            is_count: false,
        };
        let err = write.apply(&level(5, 3), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn count_stamps_last_count_at() {
        let now = Utc::now();
        let write = StockWrite {
            quantity: QuantityWrite::Set(7),
            reserved_qty: None,
            is_count: true,
        };
        let next = write.apply(&StockLevel::zero(), now).unwrap();
        assert_eq!(next.last_count_at, Some(now));

        let routine = StockWrite {
            quantity: QuantityWrite::Adjust(1),
            reserved_qty: None,
            is_count: false,
        };
        let after = routine.apply(&next, Utc::now()).unwrap();
        assert_eq!(after.last_count_at, Some(now));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every accepted write preserves the ledger invariant.
            #[test]
            fn applied_writes_preserve_invariant(
                start_qty in 0i64..10_000,
                start_reserved in 0i64..10_000,
                set in proptest::option::of(-100i64..10_000),
                delta in -10_000i64..10_000,
                reserved in proptest::option::of(-10i64..10_000),
                is_count in any::<bool>(),
            ) {
                let current = StockLevel {
                    quantity: start_qty,
                    reserved_qty: start_reserved.min(start_qty),
                    last_count_at: None,
                };
                let write = StockWrite {
                    quantity: match set {
                        Some(q) => QuantityWrite::Set(q),
                        None => QuantityWrite::Adjust(delta),
                    },
                    reserved_qty: reserved,
                    is_count,
                };

                if let Ok(next) = write.apply(&current, Utc::now()) {
                    prop_assert!(next.quantity >= 0);
                    prop_assert!(next.reserved_qty >= 0);
                    prop_assert!(next.reserved_qty <= next.quantity);
                    prop_assert_eq!(next.available(), next.quantity - next.reserved_qty);
                }
            }
        }
    }
}
