// Promo Engine
//
// Checks a promo against an order and computes the discount it grants. All
// checks run so a rejection lists every reason at once.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

use crate::pricing::round_money;
use crate::promos::models::{DiscountType, Promo, PromoDraft, PromoType};

/// A rule an order failed when applying a promo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoViolation {
    NotFound,
    Inactive,
    Exhausted,
    BelowMinimum { min: Decimal },
    NotYetValid,
    Expired,
    PerUserLimitReached,
}

impl fmt::Display for PromoViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoViolation::NotFound => write!(f, "Промокодът не е намерен"),
            PromoViolation::Inactive => write!(f, "Промокодът не е активен"),
            PromoViolation::Exhausted => write!(f, "Промокод изчерпан"),
            PromoViolation::BelowMinimum { min } => {
                write!(f, "Минималната сума за поръчка е {}", round_money(*min))
            }
            PromoViolation::NotYetValid => write!(f, "Промокодът все още не е валиден"),
            PromoViolation::Expired => write!(f, "Промокодът е изтекъл"),
            PromoViolation::PerUserLimitReached => write!(f, "Вече сте използвали този промокод"),
        }
    }
}

/// Outcome of evaluating a promo against an order amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoEvaluation {
    Valid { discount: Decimal },
    Invalid { violations: Vec<PromoViolation> },
}

impl PromoEvaluation {
    pub fn is_valid(&self) -> bool {
        matches!(self, PromoEvaluation::Valid { .. })
    }

    pub fn discount(&self) -> Decimal {
        match self {
            PromoEvaluation::Valid { discount } => *discount,
            PromoEvaluation::Invalid { .. } => Decimal::ZERO,
        }
    }

    /// User-facing reasons, empty when valid
    pub fn reasons(&self) -> Vec<String> {
        match self {
            PromoEvaluation::Valid { .. } => Vec::new(),
            PromoEvaluation::Invalid { violations } => {
                violations.iter().map(ToString::to_string).collect()
            }
        }
    }
}

/// Evaluates `promo` for an order of `order_amount`.
///
/// `prior_user_usages` is the number of earlier redemptions by the ordering
/// customer, `None` for guests.
pub fn evaluate(
    promo: &Promo,
    order_amount: Decimal,
    prior_user_usages: Option<i64>,
    now: DateTime<Utc>,
) -> PromoEvaluation {
    let mut violations = Vec::new();

    if !promo.is_active {
        violations.push(PromoViolation::Inactive);
    }

    if let Some(max_uses) = promo.max_uses {
        if promo.used_count >= max_uses {
            violations.push(PromoViolation::Exhausted);
        }
    }

    if let Some(min) = promo.min_order_amount {
        if order_amount < min {
            violations.push(PromoViolation::BelowMinimum { min });
        }
    }

    if let Some(valid_from) = promo.valid_from {
        if now < valid_from {
            violations.push(PromoViolation::NotYetValid);
        }
    }

    if let Some(valid_to) = promo.valid_to {
        if now > valid_to {
            violations.push(PromoViolation::Expired);
        }
    }

    if let Some(usages) = prior_user_usages {
        if usages >= i64::from(promo.max_uses_per_user) {
            violations.push(PromoViolation::PerUserLimitReached);
        }
    }

    if violations.is_empty() {
        PromoEvaluation::Valid {
            discount: compute_discount(promo, order_amount),
        }
    } else {
        PromoEvaluation::Invalid { violations }
    }
}

/// Discount a promo grants on `order_amount`.
///
/// Percentage discounts are capped at `max_discount`; fixed discounts are not
/// capped here, order assembly clamps them to what is left to pay.
pub fn compute_discount(promo: &Promo, order_amount: Decimal) -> Decimal {
    match promo.discount_type {
        DiscountType::Percentage => {
            let raw = promo.discount_value / Decimal::ONE_HUNDRED * order_amount;
            match promo.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountType::Fixed => promo.discount_value,
    }
}

/// Business rules for a promo definition beyond field-level validation.
///
/// Returns the normalized draft (single-use promos get `max_uses = 1`) or the
/// list of broken rules.
pub fn check_definition(mut draft: PromoDraft) -> Result<PromoDraft, Vec<String>> {
    let mut problems = Vec::new();

    match draft.discount_type {
        DiscountType::Percentage => {
            if draft.discount_value <= Decimal::ZERO || draft.discount_value > Decimal::ONE_HUNDRED {
                problems.push("Percentage discount must be greater than 0 and at most 100".to_string());
            }
        }
        DiscountType::Fixed => {
            if draft.discount_value <= Decimal::ZERO {
                problems.push("Fixed discount must be greater than 0".to_string());
            }
        }
    }

    if draft.promo_type == PromoType::DateRange {
        match (draft.valid_from, draft.valid_to) {
            (Some(from), Some(to)) if from >= to => {
                problems.push("valid_from must be before valid_to".to_string());
            }
            (Some(_), Some(_)) => {}
            _ => problems.push("Date range promos require valid_from and valid_to".to_string()),
        }
    }

    if draft.promo_type == PromoType::SingleUse {
        draft.max_uses = Some(1);
    }

    if draft.max_uses_per_user < 1 {
        problems.push("max_uses_per_user must be at least 1".to_string());
    }

    if problems.is_empty() {
        Ok(draft)
    } else {
        Err(problems)
    }
}


#[cfg(test)]
mod property_tests {
    use super::tests::promo;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A percentage discount never exceeds its share of the amount nor its cap
        #[test]
        fn prop_percentage_discount_bounded(
            percent in 1u32..=100,
            amount_cents in 0i64..1_000_000,
            cap_cents in prop::option::of(1i64..100_000)
        ) {
            let mut p = promo("PROP", DiscountType::Percentage, Decimal::from(percent));
            p.max_discount = cap_cents.map(|c| Decimal::new(c, 2));
            let amount = Decimal::new(amount_cents, 2);

            let discount = compute_discount(&p, amount);

            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= Decimal::from(percent) / Decimal::ONE_HUNDRED * amount);
            prop_assert!(discount <= amount);
            if let Some(cap) = p.max_discount {
                prop_assert!(discount <= cap);
            }
        }
    }
}
