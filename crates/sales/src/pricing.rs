//! Line and order pricing, fixed at order creation.

use rust_decimal::Decimal;

use stockdesk_core::DomainResult;

/// Sales tax rate applied to taxable lines (8.25%).
pub fn tax_rate() -> Decimal {
    Decimal::new(825, 4)
}

/// A fully priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// `quantity × unit_price − discount`.
    pub line_total: Decimal,
    /// `line_total × rate`; zero for non-taxable lines.
    pub tax_amount: Decimal,
    /// `line_total + tax_amount`.
    pub total_price: Decimal,
}

/// Price one line. The line is taxable only when the product is taxable
/// and the customer is not tax-exempt.
pub fn price_line(
    quantity: i64,
    unit_price: Decimal,
    discount: Decimal,
    taxable: bool,
) -> DomainResult<PricedLine> {
    let line_total = Decimal::from(quantity) * unit_price - discount;
    let tax_amount = if taxable {
        line_total * tax_rate()
    } else {
        Decimal::ZERO
    };
    Ok(PricedLine {
        quantity,
        unit_price,
        discount,
        line_total,
        tax_amount,
        total_price: line_total + tax_amount,
    })
}

/// Order-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// `subtotal = Σ line_total`, `tax = Σ line tax`,
/// `total = subtotal − discount + tax + shipping`.
pub fn order_totals(
    lines: &[PricedLine],
    discount_amount: Decimal,
    shipping_amount: Decimal,
) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    let tax_amount: Decimal = lines.iter().map(|l| l.tax_amount).sum();
    OrderTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal - discount_amount + tax_amount + shipping_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxable_line_uses_the_standard_rate() {
        // Scenario: 2 × 100.00, taxable, no discount.
        let line = price_line(2, Decimal::new(10000, 2), Decimal::ZERO, true).unwrap();
        assert_eq!(line.line_total, Decimal::new(20000, 2));
        assert_eq!(line.tax_amount, Decimal::new(1650, 2)); // 16.50
        assert_eq!(line.total_price, Decimal::new(21650, 2)); // 216.50

        let totals = order_totals(&[line], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::new(20000, 2));
        assert_eq!(totals.total_amount, Decimal::new(21650, 2));
    }

    #[test]
    fn exempt_line_carries_no_tax() {
        let line = price_line(3, Decimal::new(999, 2), Decimal::ZERO, false).unwrap();
        assert_eq!(line.tax_amount, Decimal::ZERO);
        assert_eq!(line.total_price, line.line_total);
    }

    #[test]
    fn discount_reduces_the_taxed_base() {
        // 10.00 − 2.00 discount = 8.00 base; tax on 8.00.
        let line = price_line(1, Decimal::new(1000, 2), Decimal::new(200, 2), true).unwrap();
        assert_eq!(line.line_total, Decimal::new(800, 2));
        assert_eq!(line.tax_amount, Decimal::new(800, 2) * tax_rate());
    }

    #[test]
    fn order_totals_match_the_independent_formula() {
        let lines = vec![
            price_line(2, Decimal::new(2500, 2), Decimal::new(100, 2), true).unwrap(),
            price_line(1, Decimal::new(1299, 2), Decimal::ZERO, false).unwrap(),
        ];
        let discount = Decimal::new(300, 2);
        let shipping = Decimal::new(795, 2);
        let totals = order_totals(&lines, discount, shipping);

        let expected_subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let expected_tax: Decimal = lines.iter().map(|l| l.tax_amount).sum();
        assert_eq!(totals.subtotal, expected_subtotal);
        assert_eq!(totals.tax_amount, expected_tax);
        assert_eq!(
            totals.total_amount,
            expected_subtotal - discount + expected_tax + shipping
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: totals always satisfy
            /// `total = Σ(line_total) − discount + Σ(tax) + shipping`.
            #[test]
            fn totals_formula_holds(
                quantities in proptest::collection::vec(1i64..1_000, 1..8),
                price_cents in 0i64..1_000_000,
                taxable in any::<bool>(),
                shipping_cents in 0i64..100_000,
            ) {
                let unit_price = Decimal::new(price_cents, 2);
                let lines: Vec<PricedLine> = quantities
                    .iter()
                    .map(|&q| price_line(q, unit_price, Decimal::ZERO, taxable).unwrap())
                    .collect();
                let shipping = Decimal::new(shipping_cents, 2);
                let totals = order_totals(&lines, Decimal::ZERO, shipping);

                let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
                let tax: Decimal = lines.iter().map(|l| l.tax_amount).sum();
                prop_assert_eq!(totals.total_amount, subtotal + tax + shipping);
                for line in &lines {
                    prop_assert_eq!(line.total_price, line.line_total + line.tax_amount);
                }
            }
        }
    }
}
