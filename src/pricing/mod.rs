// Pricing Engine
//
// Computes bouquet size variant prices from their flower and packaging
// composition, a manual extra charge and a percentage discount.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Number of decimal places money is stored and displayed with
pub const MONEY_SCALE: u32 = 2;

/// Rounds a money amount to the currency's minor unit.
///
/// Only called at persistence and display boundaries; calculations keep full
/// precision so rounding does not compound across variants.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// One composition row: a catalog item id and how many of it go into the variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionLine {
    pub item_id: i64,
    pub quantity: i32,
}

impl CompositionLine {
    pub fn new(item_id: i64, quantity: i32) -> Self {
        Self { item_id, quantity }
    }
}

/// Kind of catalog row a composition line points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    Flower,
    Packaging,
}

/// Composition line whose catalog row no longer exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UnresolvedReference {
    pub kind: ReferenceKind,
    pub id: i64,
}

/// Prices of the catalog rows referenced by a composition, fetched once
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    flowers: HashMap<i64, Decimal>,
    packaging: HashMap<i64, Decimal>,
}

impl PriceSnapshot {
    pub fn new(flowers: HashMap<i64, Decimal>, packaging: HashMap<i64, Decimal>) -> Self {
        Self { flowers, packaging }
    }

    pub fn with_flower(mut self, id: i64, price: Decimal) -> Self {
        self.flowers.insert(id, price);
        self
    }

    pub fn with_packaging(mut self, id: i64, price_per_unit: Decimal) -> Self {
        self.packaging.insert(id, price_per_unit);
        self
    }

    pub fn flower_price(&self, id: i64) -> Option<Decimal> {
        self.flowers.get(&id).copied()
    }

    pub fn packaging_price(&self, id: i64) -> Option<Decimal> {
        self.packaging.get(&id).copied()
    }
}

/// Result of a variant price computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPrice {
    pub price_base: Decimal,
    pub price_before_discount: Decimal,
    pub price: Decimal,
    /// Pre-discount price, present only when a discount applies
    pub price_old: Option<Decimal>,
    /// Composition lines that contributed nothing because their row is missing
    pub unresolved: Vec<UnresolvedReference>,
}

impl VariantPrice {
    /// Copy with all money fields rounded for persistence
    pub fn rounded(&self) -> Self {
        Self {
            price_base: round_money(self.price_base),
            price_before_discount: round_money(self.price_before_discount),
            price: round_money(self.price),
            price_old: self.price_old.map(round_money),
            unresolved: self.unresolved.clone(),
        }
    }
}

/// Composition whose price does not fit in a `Decimal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Variant price exceeds the supported range")]
pub struct PriceOverflow;

/// Adds `price × quantity` to `total`
fn add_line(total: Decimal, price: Decimal, quantity: i32) -> Result<Decimal, PriceOverflow> {
    price
        .checked_mul(Decimal::from(quantity))
        .and_then(|line| total.checked_add(line))
        .ok_or(PriceOverflow)
}

/// Computes a size variant's price from its composition.
///
/// `price_base` sums flower price × quantity and packaging price per unit ×
/// quantity. Lines referencing rows missing from `prices` contribute zero and
/// are reported in `unresolved`. `discount_percent` is clamped to 0..=100.
pub fn compute_variant_price(
    flower_lines: &[CompositionLine],
    material_lines: &[CompositionLine],
    prices: &PriceSnapshot,
    extra_charge: Decimal,
    discount_percent: i32,
) -> Result<VariantPrice, PriceOverflow> {
    let mut unresolved = Vec::new();
    let mut price_base = Decimal::ZERO;

    for line in flower_lines {
        match prices.flower_price(line.item_id) {
            Some(price) => price_base = add_line(price_base, price, line.quantity)?,
            None => unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Flower,
                id: line.item_id,
            }),
        }
    }

    for line in material_lines {
        match prices.packaging_price(line.item_id) {
            Some(price) => price_base = add_line(price_base, price, line.quantity)?,
            None => unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Packaging,
                id: line.item_id,
            }),
        }
    }

    let discount_percent = discount_percent.clamp(0, 100);
    let price_before_discount = price_base.checked_add(extra_charge).ok_or(PriceOverflow)?;
    let price = price_before_discount
        .checked_mul(Decimal::ONE - Decimal::from(discount_percent) / Decimal::ONE_HUNDRED)
        .ok_or(PriceOverflow)?;
    let price_old = (discount_percent > 0).then_some(price_before_discount);

    Ok(VariantPrice {
        price_base,
        price_before_discount,
        price,
        price_old,
        unresolved,
    })
}

/// Catalog price lookup used to build a `PriceSnapshot`
#[async_trait]
pub trait CatalogPrices: Send + Sync {
    /// Current prices of the given flowers; missing ids are absent from the map
    async fn flower_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError>;

    /// Current unit prices of the given packaging; missing ids are absent from the map
    async fn packaging_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError>;
}

/// Fetches the prices referenced by a set of composition lines in two queries
pub async fn load_price_snapshot<'a, I, J>(
    lookup: &dyn CatalogPrices,
    flower_lines: I,
    material_lines: J,
) -> Result<PriceSnapshot, StoreError>
where
    I: IntoIterator<Item = &'a CompositionLine>,
    J: IntoIterator<Item = &'a CompositionLine>,
{
    let mut flower_ids: Vec<i64> = flower_lines.into_iter().map(|l| l.item_id).collect();
    let mut packaging_ids: Vec<i64> = material_lines.into_iter().map(|l| l.item_id).collect();
    flower_ids.sort_unstable();
    flower_ids.dedup();
    packaging_ids.sort_unstable();
    packaging_ids.dedup();

    let flowers = if flower_ids.is_empty() {
        HashMap::new()
    } else {
        lookup.flower_prices(&flower_ids).await?
    };
    let packaging = if packaging_ids.is_empty() {
        HashMap::new()
    } else {
        lookup.packaging_prices(&packaging_ids).await?
    };

    Ok(PriceSnapshot::new(flowers, packaging))
}
