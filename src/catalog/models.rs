use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::pricing::{CompositionLine, UnresolvedReference, VariantPrice};
use crate::validation::{
    validate_image_urls, validate_non_negative_amount, validate_not_blank, validate_slug,
};

/// Single cut flower sold by the stem
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Flower {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    /// Purchase cost, admin only
    pub cost: Option<Decimal>,
    pub color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFlowerRequest {
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub price: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Option<Decimal>,
    #[validate(length(max = 64))]
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFlowerRequest {
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: Option<String>,
    #[validate(custom = "validate_non_negative_amount")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Option<Decimal>,
    #[validate(length(max = 64))]
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

/// Wrapping material priced per unit
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Packaging {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub price_per_unit: Decimal,
    pub cost: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePackagingRequest {
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub price_per_unit: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePackagingRequest {
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: Option<String>,
    #[validate(custom = "validate_non_negative_amount")]
    pub price_per_unit: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Bouquet size such as S, M or L
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Size {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSizeRequest {
    #[validate(custom = "validate_not_blank", length(max = 16))]
    pub code: String,
    #[validate(custom = "validate_not_blank", length(max = 64))]
    pub name: String,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSizeRequest {
    #[validate(custom = "validate_not_blank", length(max = 16))]
    pub code: Option<String>,
    #[validate(custom = "validate_not_blank", length(max = 64))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(custom = "validate_slug")]
    pub slug: String,
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: Option<String>,
}

/// Query parameters for flower and packaging listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActiveQuery {
    /// Only rows with this `is_active` value
    pub active: Option<bool>,
}

/// Bouquet row without its translations and variants
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Bouquet {
    pub id: i64,
    pub sku: String,
    pub category_id: Option<i64>,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BouquetTranslation {
    #[serde(skip)]
    pub bouquet_id: i64,
    pub locale: String,
    pub name: String,
    pub description: Option<String>,
}

/// Stored size variant row
#[derive(Debug, Clone, FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub bouquet_id: i64,
    pub size_id: i64,
    pub flower_count: i32,
    pub price_base: Decimal,
    pub extra_charge: Decimal,
    pub discount_percent: i32,
    pub price: Decimal,
    pub price_old: Option<Decimal>,
}

/// Stored composition row of a variant
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CompositionRow {
    pub variant_id: i64,
    pub item_id: i64,
    pub quantity: i32,
}

/// A flower or packaging id with the quantity used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompositionItem {
    pub id: i64,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

impl CompositionItem {
    pub fn line(&self) -> CompositionLine {
        CompositionLine::new(self.id, self.quantity)
    }
}

/// Size variant as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BouquetVariant {
    pub id: i64,
    pub size_id: i64,
    pub flower_count: i32,
    pub price_base: Decimal,
    pub extra_charge: Decimal,
    pub discount_percent: i32,
    pub price: Decimal,
    pub price_old: Option<Decimal>,
    pub flowers: Vec<CompositionItem>,
    pub materials: Vec<CompositionItem>,
}

impl BouquetVariant {
    /// Turns the stored variant back into an editable definition
    pub fn input(&self) -> VariantInput {
        VariantInput {
            size_id: self.size_id,
            flower_count: self.flower_count,
            extra_charge: self.extra_charge,
            discount_percent: self.discount_percent,
            flowers: self.flowers.clone(),
            materials: self.materials.clone(),
        }
    }
}

/// Bouquet with translations and priced variants
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BouquetDetails {
    #[serde(flatten)]
    pub bouquet: Bouquet,
    pub translations: Vec<BouquetTranslation>,
    pub variants: Vec<BouquetVariant>,
}

/// Admin response after saving or repricing a bouquet
#[derive(Debug, Serialize, ToSchema)]
pub struct BouquetSaveResponse {
    #[serde(flatten)]
    pub bouquet: BouquetDetails,
    /// Composition lines priced at zero because their row is missing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnresolvedReference>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TranslationInput {
    #[validate(custom = "validate_not_blank", length(max = 8))]
    pub locale: String,
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
    pub description: Option<String>,
}

/// Size variant definition; prices are computed, never sent
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VariantInput {
    pub size_id: i64,
    #[validate(range(min = 0, message = "flower_count must not be negative"))]
    pub flower_count: i32,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_amount")]
    pub extra_charge: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "discount_percent must be between 0 and 100"))]
    pub discount_percent: i32,
    #[serde(default)]
    #[validate]
    pub flowers: Vec<CompositionItem>,
    #[serde(default)]
    #[validate]
    pub materials: Vec<CompositionItem>,
}

impl VariantInput {
    pub fn flower_lines(&self) -> Vec<CompositionLine> {
        self.flowers.iter().map(CompositionItem::line).collect()
    }

    pub fn material_lines(&self) -> Vec<CompositionLine> {
        self.materials.iter().map(CompositionItem::line).collect()
    }
}

/// Full bouquet definition used for both create and update; at least one
/// translation and one variant are required
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BouquetRequest {
    pub category_id: Option<i64>,
    #[serde(default)]
    #[validate(custom = "validate_image_urls")]
    pub image_urls: Vec<String>,
    pub is_active: Option<bool>,
    #[validate]
    pub translations: Vec<TranslationInput>,
    #[validate]
    pub variants: Vec<VariantInput>,
}

/// Variant definition with its computed, rounded price
#[derive(Debug, Clone)]
pub struct PricedVariant {
    pub input: VariantInput,
    pub price: VariantPrice,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BouquetListQuery {
    pub category_id: Option<i64>,
    pub active: Option<bool>,
}
