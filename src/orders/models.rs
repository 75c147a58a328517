use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::loyalty::CustomerStatus;
use crate::promos::models::{PromoRedemption, PromoRejection};
use crate::validation::{validate_non_negative_amount, validate_not_blank};

/// Order status enum representing the lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Confirmed,
    InProgress,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Delivering => "DELIVERING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Delivered and cancelled orders accept no further transitions
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of catalog row an order line was resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemType {
    Flower,
    Packaging,
    Bouquet,
    /// SKU matched no catalog row at checkout
    Unresolved,
}

/// Domain model representing an order in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time_slot: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_price: Decimal,
    pub status_discount: Decimal,
    pub promo_discount: Decimal,
    pub promo_code: Option<String>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of an ordered line
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: Uuid,
    pub sku: String,
    pub item_type: OrderItemType,
    pub item_id: i64,
    pub product_name_snapshot: String,
    pub price_snapshot: Decimal,
    pub quantity: i32,
}

/// Who places the order
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerInfo {
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
    #[validate(custom = "validate_not_blank", length(max = 32))]
    pub phone: String,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
}

/// Where and when the order is delivered
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliveryInfo {
    pub address: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 32))]
    pub time_slot: Option<String>,
    #[validate(length(max = 255))]
    pub recipient_name: Option<String>,
    #[validate(length(max = 32))]
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
}

/// One line of a checkout request, priced by the storefront
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LineItemRequest {
    #[validate(custom = "validate_not_blank", length(max = 32))]
    pub sku: String,
    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub name: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub price: Decimal,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// Request DTO for checkout
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate]
    pub customer: CustomerInfo,
    #[serde(default)]
    #[validate]
    pub delivery: DeliveryInfo,
    #[validate]
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_amount")]
    pub delivery_price: Decimal,
    pub promo_code: Option<String>,
}

/// Request DTO for updating order status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Request DTO for editing delivery details; omitted fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryRequest {
    pub delivery_address: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    #[validate(length(max = 32))]
    pub delivery_time_slot: Option<String>,
    #[validate(length(max = 255))]
    pub recipient_name: Option<String>,
    #[validate(length(max = 32))]
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
}

impl UpdateDeliveryRequest {
    pub fn is_empty(&self) -> bool {
        self.delivery_address.is_none()
            && self.delivery_date.is_none()
            && self.delivery_time_slot.is_none()
            && self.recipient_name.is_none()
            && self.recipient_phone.is_none()
            && self.notes.is_none()
    }
}

/// Query parameters for order listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderHistoryQuery {
    pub status: Option<OrderStatus>,
}

/// Selection of orders for listing
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// Line snapshot ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub sku: String,
    pub item_type: OrderItemType,
    pub item_id: i64,
    pub product_name_snapshot: String,
    pub price_snapshot: Decimal,
    pub quantity: i32,
}

/// Everything a checkout writes in its transaction
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub order_id: Uuid,
    pub user_id: Option<i64>,
    pub customer: CustomerInfo,
    pub delivery: DeliveryInfo,
    pub items: Vec<NewOrderItem>,
    pub subtotal: Decimal,
    pub delivery_price: Decimal,
    pub status_discount: Decimal,
    pub promo_discount: Decimal,
    pub promo_code: Option<String>,
    pub total_amount: Decimal,
    /// Present when a promo discount is applied
    pub promo_claim: Option<PromoRedemption>,
}

/// Response DTO for order with items
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// How the order total was reached
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiscountBreakdown {
    /// Line items plus delivery
    pub subtotal: Decimal,
    pub customer_status: Option<CustomerStatus>,
    pub status_discount_rate: Decimal,
    pub status_discount: Decimal,
    pub promo_code: Option<String>,
    pub promo_discount: Decimal,
    pub total_amount: Decimal,
}

/// Checkout result
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order: OrderResponse,
    pub breakdown: DiscountBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_rejection: Option<PromoRejection>,
}
