use rust_decimal::Decimal;

use crate::pricing::round_money;

/// Money amounts of an order after discounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub status_discount: Decimal,
    pub promo_discount: Decimal,
    pub total_amount: Decimal,
}

/// Service for calculating order prices and subtotals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate subtotal for an order line
    ///
    /// # Returns
    /// Subtotal as Decimal (quantity * price_snapshot), `None` on overflow
    pub fn calculate_subtotal(quantity: i32, price_snapshot: Decimal) -> Option<Decimal> {
        Decimal::from(quantity).checked_mul(price_snapshot)
    }

    /// Calculate total price for a set of line subtotals, `None` on overflow
    pub fn calculate_total(subtotals: &[Decimal]) -> Option<Decimal> {
        subtotals
            .iter()
            .try_fold(Decimal::ZERO, |total, subtotal| total.checked_add(*subtotal))
    }

    /// Order subtotal: all line subtotals plus the delivery price
    pub fn order_subtotal(line_subtotals: &[Decimal], delivery_price: Decimal) -> Option<Decimal> {
        Self::calculate_total(line_subtotals)?.checked_add(delivery_price)
    }

    /// Applies the loyalty rate first, then the promo discount.
    ///
    /// Amounts are rounded to cents before subtracting so the stored total is
    /// exactly `subtotal - status_discount - promo_discount`. The promo
    /// discount is clamped to what is left after the loyalty discount, which
    /// keeps the total at zero or above.
    pub fn totals(subtotal: Decimal, status_rate: Decimal, promo_discount: Decimal) -> OrderTotals {
        let subtotal = round_money(subtotal);
        let status_discount = round_money(subtotal * status_rate)
            .max(Decimal::ZERO)
            .min(subtotal);
        let remaining = subtotal - status_discount;
        let promo_discount = round_money(promo_discount)
            .max(Decimal::ZERO)
            .min(remaining);

        OrderTotals {
            subtotal,
            status_discount,
            promo_discount,
            total_amount: remaining - promo_discount,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn money(cents: u32) -> Decimal {
        Decimal::from(cents) / Decimal::from(100)
    }

    proptest! {
        /// Verifies that subtotal = quantity * price for all valid inputs
        #[test]
        fn prop_subtotal_calculation_invariant(
            quantity in 1i32..=1000,
            price_cents in 1u32..=10000u32
        ) {
            let price = money(price_cents);
            prop_assert_eq!(
                PriceCalculator::calculate_subtotal(quantity, price),
                Some(Decimal::from(quantity) * price)
            );
        }

        /// total = subtotal - both discounts, discounts non-negative, total never negative
        #[test]
        fn prop_totals_invariant(
            subtotal_cents in 0u32..=1_000_000,
            rate_index in 0usize..4,
            promo_cents in 0u32..=2_000_000
        ) {
            let rates = [Decimal::ZERO, Decimal::new(5, 2), Decimal::new(10, 2), Decimal::new(15, 2)];
            let totals = PriceCalculator::totals(money(subtotal_cents), rates[rate_index], money(promo_cents));

            prop_assert!(totals.status_discount >= Decimal::ZERO);
            prop_assert!(totals.promo_discount >= Decimal::ZERO);
            prop_assert!(totals.total_amount >= Decimal::ZERO);
            prop_assert!(totals.status_discount + totals.promo_discount <= totals.subtotal);
            prop_assert_eq!(
                totals.total_amount,
                totals.subtotal - totals.status_discount - totals.promo_discount
            );
        }
    }
}
