// Loyalty Engine
//
// Classifies customers into tiers from their cumulative order count and spend,
// and maps each tier to the discount rate applied at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Customer loyalty tier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    New,
    Regular,
    Loyal,
    Vip,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::New => "NEW",
            CustomerStatus::Regular => "REGULAR",
            CustomerStatus::Loyal => "LOYAL",
            CustomerStatus::Vip => "VIP",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(CustomerStatus::New),
            "REGULAR" => Ok(CustomerStatus::Regular),
            "LOYAL" => Ok(CustomerStatus::Loyal),
            "VIP" => Ok(CustomerStatus::Vip),
            _ => Err(format!("Invalid customer status: {}", s)),
        }
    }
}

/// Classify a customer from cumulative aggregates.
///
/// Tiers are checked from highest to lowest and the first match wins, so a
/// customer qualifies for a tier by either order count or spend.
pub fn classify(total_orders: i32, total_spent: Decimal) -> CustomerStatus {
    if total_orders > 10 || total_spent > Decimal::from(1000) {
        CustomerStatus::Vip
    } else if total_orders >= 6 || total_spent >= Decimal::from(500) {
        CustomerStatus::Loyal
    } else if total_orders >= 2 || total_spent >= Decimal::from(100) {
        CustomerStatus::Regular
    } else {
        CustomerStatus::New
    }
}

/// Discount rate for a tier as a fraction (0.15 = 15%)
pub fn discount_rate_for(status: CustomerStatus) -> Decimal {
    match status {
        CustomerStatus::Vip => Decimal::new(15, 2),
        CustomerStatus::Loyal => Decimal::new(10, 2),
        CustomerStatus::Regular => Decimal::new(5, 2),
        CustomerStatus::New => Decimal::ZERO,
    }
}

/// Cumulative order statistics stored on a customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAggregates {
    pub total_orders: i32,
    pub total_spent: Decimal,
    pub last_order_date: Option<DateTime<Utc>>,
}

impl CustomerAggregates {
    pub fn new(total_orders: i32, total_spent: Decimal) -> Self {
        Self {
            total_orders,
            total_spent,
            last_order_date: None,
        }
    }

    pub fn status(&self) -> CustomerStatus {
        classify(self.total_orders, self.total_spent)
    }

    /// Discount rate earned by the aggregates as they stand before a new order
    pub fn discount_rate(&self) -> Decimal {
        discount_rate_for(self.status())
    }

    /// Aggregates after one more order of `final_amount`
    pub fn apply_order(&self, final_amount: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            total_orders: self.total_orders + 1,
            total_spent: self.total_spent + final_amount,
            last_order_date: Some(at),
        }
    }
}

impl Default for CustomerAggregates {
    fn default() -> Self {
        Self::new(0, Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thresholds() {
        assert_eq!(classify(0, dec!(0)), CustomerStatus::New);
        assert_eq!(classify(1, dec!(99.99)), CustomerStatus::New);
        assert_eq!(classify(2, dec!(0)), CustomerStatus::Regular);
        assert_eq!(classify(0, dec!(100)), CustomerStatus::Regular);
        assert_eq!(classify(6, dec!(0)), CustomerStatus::Loyal);
        assert_eq!(classify(0, dec!(500)), CustomerStatus::Loyal);
        assert_eq!(classify(10, dec!(1000)), CustomerStatus::Loyal);
        assert_eq!(classify(11, dec!(0)), CustomerStatus::Vip);
        assert_eq!(classify(0, dec!(1000.01)), CustomerStatus::Vip);
    }

    #[test]
    fn test_rates() {
        assert_eq!(discount_rate_for(CustomerStatus::New), dec!(0));
        assert_eq!(discount_rate_for(CustomerStatus::Regular), dec!(0.05));
        assert_eq!(discount_rate_for(CustomerStatus::Loyal), dec!(0.10));
        assert_eq!(discount_rate_for(CustomerStatus::Vip), dec!(0.15));
    }

    #[test]
    fn test_regular_customer_moves_to_loyal_after_order() {
        // 5 prior orders worth 480 earn REGULAR; a 200 order pushes them to LOYAL
        let before = CustomerAggregates::new(5, dec!(480));
        assert_eq!(before.status(), CustomerStatus::Regular);

        let subtotal = dec!(200);
        let discount = before.discount_rate() * subtotal;
        assert_eq!(discount, dec!(10.00));

        let after = before.apply_order(subtotal - discount, Utc::now());
        assert_eq!(after.total_orders, 6);
        assert_eq!(after.total_spent, dec!(670.00));
        assert_eq!(after.status(), CustomerStatus::Loyal);
        assert!(after.last_order_date.is_some());
    }

    #[test]
    fn test_new_tier_reached_applies_to_next_order_only() {
        let before = CustomerAggregates::new(1, dec!(80));
        assert_eq!(before.status(), CustomerStatus::New);
        assert_eq!(before.discount_rate(), Decimal::ZERO);

        let after = before.apply_order(dec!(70), Utc::now());
        assert_eq!(after.total_spent, dec!(150));
        assert_eq!(after.status(), CustomerStatus::Regular);
        assert_eq!(after.discount_rate(), dec!(0.05));
    }

    #[test]
    fn test_status_string_round_trip_for_storage() {
        for status in [
            CustomerStatus::New,
            CustomerStatus::Regular,
            CustomerStatus::Loyal,
            CustomerStatus::Vip,
        ] {
            assert_eq!(status.as_str().parse::<CustomerStatus>(), Ok(status));
        }
        assert!("GOLD".parse::<CustomerStatus>().is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// More orders or more spend never lowers the tier
        #[test]
        fn prop_classification_is_monotonic(
            orders in 0i32..40,
            spent_cents in 0i64..300_000,
            extra_orders in 0i32..10,
            extra_cents in 0i64..100_000
        ) {
            let spent = Decimal::new(spent_cents, 2);
            let base = classify(orders, spent);

            prop_assert!(classify(orders + extra_orders, spent) >= base);
            prop_assert!(classify(orders, spent + Decimal::new(extra_cents, 2)) >= base);
        }

        /// Higher tiers always carry a rate at least as large
        #[test]
        fn prop_rate_follows_tier(orders in 0i32..40, spent_cents in 0i64..300_000) {
            let status = classify(orders, Decimal::new(spent_cents, 2));
            let rate = discount_rate_for(status);
            prop_assert!(rate >= Decimal::ZERO && rate <= Decimal::new(15, 2));
        }
    }
}
