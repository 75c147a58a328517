use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::customers::repository::apply_order_in_tx;
use crate::db::next_sequence_number;
use crate::orders::{
    CheckoutPlan, Order, OrderFilter, OrderItem, OrderStatus, UpdateDeliveryRequest,
};
use crate::promos::repository::claim_in_tx;
use crate::store::{CheckoutCommit, OrderStore, RedeemOutcome, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, customer_phone, \
     customer_email, delivery_address, delivery_date, delivery_time_slot, recipient_name, \
     recipient_phone, notes, status, subtotal, delivery_price, status_discount, promo_discount, \
     promo_code, total_amount, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, sku, item_type, item_id, product_name_snapshot, price_snapshot, quantity";

/// Repository for order operations
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new OrderRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<CheckoutCommit, StoreError> {
        let mut tx = self.pool.begin().await?;

        let order_number = next_sequence_number(&mut tx, "ORD").await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (id, order_number, user_id, customer_name, customer_phone,
                customer_email, delivery_address, delivery_date, delivery_time_slot,
                recipient_name, recipient_phone, notes, status, subtotal, delivery_price,
                status_discount, promo_discount, promo_code, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(plan.order_id)
        .bind(&order_number)
        .bind(plan.user_id)
        .bind(&plan.customer.name)
        .bind(&plan.customer.phone)
        .bind(&plan.customer.email)
        .bind(&plan.delivery.address)
        .bind(plan.delivery.date)
        .bind(&plan.delivery.time_slot)
        .bind(&plan.delivery.recipient_name)
        .bind(&plan.delivery.recipient_phone)
        .bind(&plan.delivery.notes)
        .bind(OrderStatus::New)
        .bind(plan.subtotal)
        .bind(plan.delivery_price)
        .bind(plan.status_discount)
        .bind(plan.promo_discount)
        .bind(&plan.promo_code)
        .bind(plan.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            let stored = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_items (order_id, sku, item_type, item_id,
                    product_name_snapshot, price_snapshot, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                ORDER_ITEM_COLUMNS
            ))
            .bind(order.id)
            .bind(&item.sku)
            .bind(item.item_type)
            .bind(item.item_id)
            .bind(&item.product_name_snapshot)
            .bind(item.price_snapshot)
            .bind(item.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(stored);
        }

        if let Some(claim) = &plan.promo_claim {
            if let RedeemOutcome::Rejected(violation) = claim_in_tx(&mut tx, claim).await? {
                debug!(
                    "Rolling back order {}: promo {} claim rejected ({})",
                    order_number, claim.promo_id, violation
                );
                tx.rollback().await?;
                return Ok(CheckoutCommit::PromoClaimRejected(violation));
            }
        }

        if let Some(user_id) = plan.user_id {
            if apply_order_in_tx(&mut tx, user_id, plan.total_amount).await?.is_none() {
                warn!("Customer {} vanished during checkout of {}", user_id, order_number);
                tx.rollback().await?;
                return Err(StoreError::Unavailable(format!(
                    "customer {} does not exist",
                    user_id
                )));
            }
        }

        tx.commit().await?;
        Ok(CheckoutCommit::Committed { order, items })
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, order_number DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(filter.user_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn update_delivery(
        &self,
        id: Uuid,
        delivery: &UpdateDeliveryRequest,
    ) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET delivery_address = COALESCE($2, delivery_address),
                delivery_date = COALESCE($3, delivery_date),
                delivery_time_slot = COALESCE($4, delivery_time_slot),
                recipient_name = COALESCE($5, recipient_name),
                recipient_phone = COALESCE($6, recipient_phone),
                notes = COALESCE($7, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(&delivery.delivery_address)
        .bind(delivery.delivery_date)
        .bind(&delivery.delivery_time_slot)
        .bind(&delivery.recipient_name)
        .bind(&delivery.recipient_phone)
        .bind(&delivery.notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }
}
