use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{
    validate_non_negative_amount, validate_not_blank, validate_positive_amount, validate_promo_code,
};

/// How long and how often a promo can be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoType {
    /// One redemption in total
    SingleUse,
    Permanent,
    /// Valid between `valid_from` and `valid_to`
    DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Promo code as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Promo {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub promo_type: PromoType,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub max_uses_per_user: i32,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One redemption of a promo by an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PromoUsage {
    pub id: i64,
    pub promo_id: i64,
    pub order_id: Uuid,
    pub user_id: Option<i64>,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}

/// Claim on a promo made while committing an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoRedemption {
    pub promo_id: i64,
    pub order_id: Uuid,
    pub user_id: Option<i64>,
    pub discount_amount: Decimal,
}

/// Fully resolved promo definition ready to insert or overwrite
#[derive(Debug, Clone, PartialEq)]
pub struct PromoDraft {
    pub code: String,
    pub description: Option<String>,
    pub promo_type: PromoType,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub max_uses_per_user: i32,
    pub is_active: bool,
}

impl From<&Promo> for PromoDraft {
    fn from(promo: &Promo) -> Self {
        Self {
            code: promo.code.clone(),
            description: promo.description.clone(),
            promo_type: promo.promo_type,
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            min_order_amount: promo.min_order_amount,
            max_discount: promo.max_discount,
            valid_from: promo.valid_from,
            valid_to: promo.valid_to,
            max_uses: promo.max_uses,
            max_uses_per_user: promo.max_uses_per_user,
            is_active: promo.is_active,
        }
    }
}

/// Request DTO for creating a promo; a code is generated when omitted
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePromoRequest {
    #[validate(custom = "validate_promo_code")]
    pub code: Option<String>,
    pub description: Option<String>,
    pub promo_type: PromoType,
    pub discount_type: DiscountType,
    #[validate(custom = "validate_positive_amount")]
    pub discount_value: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "validate_positive_amount")]
    pub max_discount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 1, message = "max_uses_per_user must be at least 1"))]
    pub max_uses_per_user: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request DTO for editing a promo; omitted fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePromoRequest {
    pub description: Option<String>,
    pub promo_type: Option<PromoType>,
    pub discount_type: Option<DiscountType>,
    #[validate(custom = "validate_positive_amount")]
    pub discount_value: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "validate_positive_amount")]
    pub max_discount: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 1, message = "max_uses_per_user must be at least 1"))]
    pub max_uses_per_user: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request DTO for checking a code against an order amount
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidatePromoRequest {
    #[validate(custom = "validate_not_blank")]
    pub code: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub order_amount: Decimal,
}

/// Result of a promo check
#[derive(Debug, Serialize, ToSchema)]
pub struct PromoValidationResponse {
    pub code: String,
    pub valid: bool,
    pub discount: Decimal,
    pub errors: Vec<String>,
}

/// Why a promo code did not reduce an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PromoRejection {
    pub code: String,
    pub reasons: Vec<String>,
}

/// Query parameters for the admin promo list
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PromoListQuery {
    pub active: Option<bool>,
}
