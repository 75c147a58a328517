use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::customers::models::Customer;
use crate::loyalty::{classify, CustomerStatus};
use crate::store::{CustomerStore, StoreError};

const CUSTOMER_COLUMNS: &str = "id, email, name, phone, role, total_orders, total_spent, \
     customer_status, last_order_date, created_at";

/// Adds one order of `final_amount` to a customer's aggregates and
/// re-classifies them, inside the caller's transaction.
///
/// The increment is a single UPDATE, so the row stays locked until the
/// transaction ends and the classification reads the values it wrote.
/// Returns `None` when the customer does not exist.
pub(crate) async fn apply_order_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: i64,
    final_amount: Decimal,
) -> Result<Option<Customer>, sqlx::Error> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        r#"
        UPDATE users
        SET total_orders = total_orders + 1,
            total_spent = total_spent + $2,
            last_order_date = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CUSTOMER_COLUMNS
    ))
    .bind(customer_id)
    .bind(final_amount)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(mut customer) = customer else {
        return Ok(None);
    };

    let status = classify(customer.total_orders, customer.total_spent);
    if status != customer.customer_status {
        sqlx::query("UPDATE users SET customer_status = $2 WHERE id = $1")
            .bind(customer_id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        debug!(
            "Customer {} moved from {} to {}",
            customer_id, customer.customer_status, status
        );
        customer.customer_status = status;
    }

    Ok(Some(customer))
}

/// PostgreSQL customer storage
#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn list_customers(&self, status: Option<CustomerStatus>) -> Result<Vec<Customer>, StoreError> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM users WHERE ($1::TEXT IS NULL OR customer_status = $1) ORDER BY id",
            CUSTOMER_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn recalculate_aggregates(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let (order_count, total_spent, last_order_date): (i64, Decimal, Option<DateTime<Utc>>) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*), COALESCE(SUM(total_amount), 0), MAX(created_at)
                FROM orders
                WHERE user_id = $1 AND status <> 'CANCELLED'
                "#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let total_orders = i32::try_from(order_count).unwrap_or(i32::MAX);
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE users
            SET total_orders = $2, total_spent = $3, last_order_date = $4, customer_status = $5
            WHERE id = $1
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .bind(total_orders)
        .bind(total_spent)
        .bind(last_order_date)
        .bind(classify(total_orders, total_spent))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(customer))
    }
}
