// Storage seams used by checkout, promo and customer services
//
// Each trait has a PostgreSQL implementation next to its domain module and an
// in-memory implementation in `memory` for tests and local demos.

pub mod memory;

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::customers::models::Customer;
use crate::loyalty::CustomerStatus;
use crate::orders::models::{CheckoutPlan, Order, OrderFilter, OrderItem, OrderItemType, OrderStatus, UpdateDeliveryRequest};
use crate::pricing::CatalogPrices;
use crate::promos::engine::PromoViolation;
use crate::promos::models::{Promo, PromoDraft, PromoRedemption, PromoUsage};

pub use memory::MemoryStore;

/// Errors raised by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Duplicate value: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(error)
    }
}

/// Catalog row a SKU resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedItem {
    pub item_type: OrderItemType,
    pub item_id: i64,
}

/// Outcome of committing a checkout
#[derive(Debug, Clone)]
pub enum CheckoutCommit {
    Committed { order: Order, items: Vec<OrderItem> },
    /// The promo could no longer be claimed; nothing was written
    PromoClaimRejected(PromoViolation),
}

/// Outcome of a standalone promo redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed,
    Rejected(PromoViolation),
}

/// Catalog reads needed by pricing and checkout
#[async_trait]
pub trait CatalogLookup: CatalogPrices {
    /// Resolves SKUs to catalog rows; unknown SKUs are absent from the map
    async fn resolve_skus(&self, skus: &[String]) -> Result<HashMap<String, ResolvedItem>, StoreError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>, StoreError>;

    async fn list_customers(&self, status: Option<CustomerStatus>) -> Result<Vec<Customer>, StoreError>;

    /// Recomputes order count, spend and last order date from non-cancelled
    /// orders and re-classifies the customer
    async fn recalculate_aggregates(&self, id: i64) -> Result<Option<Customer>, StoreError>;
}

#[async_trait]
pub trait PromoStore: Send + Sync {
    /// Looks up a promo by its normalized code
    async fn find_promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError>;

    async fn find_promo(&self, id: i64) -> Result<Option<Promo>, StoreError>;

    async fn list_promos(&self, active: Option<bool>) -> Result<Vec<Promo>, StoreError>;

    async fn count_user_usages(&self, promo_id: i64, user_id: i64) -> Result<i64, StoreError>;

    async fn list_usages(&self, promo_id: i64) -> Result<Vec<PromoUsage>, StoreError>;

    async fn insert_promo(&self, draft: &PromoDraft) -> Result<Promo, StoreError>;

    async fn update_promo(&self, id: i64, draft: &PromoDraft) -> Result<Option<Promo>, StoreError>;

    /// Atomically claims one use of a promo and records the usage.
    ///
    /// Rejected when the promo is inactive, `used_count` already reached
    /// `max_uses`, or the user reached `max_uses_per_user`.
    async fn redeem(&self, redemption: &PromoRedemption) -> Result<RedeemOutcome, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order, its items, the promo claim and the customer
    /// aggregate update as one unit; either everything is written or nothing.
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<CheckoutCommit, StoreError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;

    /// Orders newest first
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Moves an order from `from` to `to`; `None` when the order is missing or
    /// no longer in `from`
    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError>;

    async fn update_delivery(
        &self,
        id: Uuid,
        delivery: &UpdateDeliveryRequest,
    ) -> Result<Option<Order>, StoreError>;
}
