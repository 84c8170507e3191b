//! Human-facing order number generation.
//!
//! Numbers follow `<PREFIX>-YYMM-XXXXXX`, e.g. `PO-2608-1A9F3C`. The suffix
//! is drawn from a fresh UUIDv7, so numbers are effectively unique; the
//! database unique constraint is the backstop for a rare collision.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Prefix for purchase order numbers.
pub const PURCHASE_ORDER_PREFIX: &str = "PO";

/// Prefix for sales order numbers.
pub const SALES_ORDER_PREFIX: &str = "SO";

/// Generate an order number for the given prefix at `now`.
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::now_v7()
        .simple()
        .to_string()
        .chars()
        .rev()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%y%m"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn follows_prefix_yymm_suffix_shape() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let n = generate(PURCHASE_ORDER_PREFIX, now);
        assert!(n.starts_with("PO-2608-"), "unexpected number: {n}");
        assert_eq!(n.len(), "PO-2608-".len() + 6);
        assert!(
            n["PO-2608-".len()..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn distinct_across_calls() {
        let now = Utc::now();
        let a = generate(SALES_ORDER_PREFIX, now);
        let b = generate(SALES_ORDER_PREFIX, now);
        assert_ne!(a, b);
    }
}
