use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::promos::engine::PromoViolation;
use crate::promos::models::{Promo, PromoDraft, PromoRedemption, PromoUsage};
use crate::store::{PromoStore, RedeemOutcome, StoreError};

const PROMO_COLUMNS: &str = "id, code, description, promo_type, discount_type, discount_value, \
     min_order_amount, max_discount, valid_from, valid_to, max_uses, max_uses_per_user, \
     used_count, is_active, created_at, updated_at";

/// Claims one use of a promo inside the caller's transaction.
///
/// The conditional UPDATE both checks and increments `used_count`, and holds
/// the promo row lock until the transaction ends, so the per-user count read
/// afterwards cannot race another claim. On `Rejected` the increment may
/// already be applied: the caller must roll the transaction back.
pub(crate) async fn claim_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    redemption: &PromoRedemption,
) -> Result<RedeemOutcome, sqlx::Error> {
    let per_user_cap: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE promos
        SET used_count = used_count + 1, updated_at = NOW()
        WHERE id = $1
          AND is_active
          AND (max_uses IS NULL OR used_count < max_uses)
        RETURNING max_uses_per_user
        "#,
    )
    .bind(redemption.promo_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(per_user_cap) = per_user_cap else {
        let is_active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM promos WHERE id = $1")
            .bind(redemption.promo_id)
            .fetch_optional(&mut **tx)
            .await?;
        let violation = match is_active {
            None => PromoViolation::NotFound,
            Some(false) => PromoViolation::Inactive,
            Some(true) => PromoViolation::Exhausted,
        };
        return Ok(RedeemOutcome::Rejected(violation));
    };

    if let Some(user_id) = redemption.user_id {
        let used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promo_usages WHERE promo_id = $1 AND user_id = $2",
        )
        .bind(redemption.promo_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        if used >= i64::from(per_user_cap) {
            return Ok(RedeemOutcome::Rejected(PromoViolation::PerUserLimitReached));
        }
    }

    sqlx::query(
        r#"
        INSERT INTO promo_usages (promo_id, order_id, user_id, discount_amount)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(redemption.promo_id)
    .bind(redemption.order_id)
    .bind(redemption.user_id)
    .bind(redemption.discount_amount)
    .execute(&mut **tx)
    .await?;

    Ok(RedeemOutcome::Redeemed)
}

/// PostgreSQL promo storage
#[derive(Clone)]
pub struct PromoRepository {
    pool: PgPool,
}

impl PromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoStore for PromoRepository {
    async fn find_promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError> {
        let promo = sqlx::query_as::<_, Promo>(&format!(
            "SELECT {} FROM promos WHERE code = $1",
            PROMO_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn find_promo(&self, id: i64) -> Result<Option<Promo>, StoreError> {
        let promo = sqlx::query_as::<_, Promo>(&format!(
            "SELECT {} FROM promos WHERE id = $1",
            PROMO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn list_promos(&self, active: Option<bool>) -> Result<Vec<Promo>, StoreError> {
        let promos = sqlx::query_as::<_, Promo>(&format!(
            "SELECT {} FROM promos WHERE ($1::BOOLEAN IS NULL OR is_active = $1) ORDER BY created_at DESC, id DESC",
            PROMO_COLUMNS
        ))
        .bind(active)
        .fetch_all(&self.pool)
        .await?;

        Ok(promos)
    }

    async fn count_user_usages(&self, promo_id: i64, user_id: i64) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promo_usages WHERE promo_id = $1 AND user_id = $2",
        )
        .bind(promo_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_usages(&self, promo_id: i64) -> Result<Vec<PromoUsage>, StoreError> {
        let usages = sqlx::query_as::<_, PromoUsage>(
            r#"
            SELECT id, promo_id, order_id, user_id, discount_amount, used_at
            FROM promo_usages
            WHERE promo_id = $1
            ORDER BY used_at DESC, id DESC
            "#,
        )
        .bind(promo_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }

    async fn insert_promo(&self, draft: &PromoDraft) -> Result<Promo, StoreError> {
        let promo = sqlx::query_as::<_, Promo>(&format!(
            r#"
            INSERT INTO promos (code, description, promo_type, discount_type, discount_value,
                min_order_amount, max_discount, valid_from, valid_to, max_uses,
                max_uses_per_user, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PROMO_COLUMNS
        ))
        .bind(&draft.code)
        .bind(&draft.description)
        .bind(draft.promo_type)
        .bind(draft.discount_type)
        .bind(draft.discount_value)
        .bind(draft.min_order_amount)
        .bind(draft.max_discount)
        .bind(draft.valid_from)
        .bind(draft.valid_to)
        .bind(draft.max_uses)
        .bind(draft.max_uses_per_user)
        .bind(draft.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn update_promo(&self, id: i64, draft: &PromoDraft) -> Result<Option<Promo>, StoreError> {
        let promo = sqlx::query_as::<_, Promo>(&format!(
            r#"
            UPDATE promos
            SET description = $2, promo_type = $3, discount_type = $4, discount_value = $5,
                min_order_amount = $6, max_discount = $7, valid_from = $8, valid_to = $9,
                max_uses = $10, max_uses_per_user = $11, is_active = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROMO_COLUMNS
        ))
        .bind(id)
        .bind(&draft.description)
        .bind(draft.promo_type)
        .bind(draft.discount_type)
        .bind(draft.discount_value)
        .bind(draft.min_order_amount)
        .bind(draft.max_discount)
        .bind(draft.valid_from)
        .bind(draft.valid_to)
        .bind(draft.max_uses)
        .bind(draft.max_uses_per_user)
        .bind(draft.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    async fn redeem(&self, redemption: &PromoRedemption) -> Result<RedeemOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let outcome = claim_in_tx(&mut tx, redemption).await?;

        match outcome {
            RedeemOutcome::Redeemed => tx.commit().await?,
            RedeemOutcome::Rejected(ref violation) => {
                debug!("Promo {} claim rejected: {}", redemption.promo_id, violation);
                tx.rollback().await?
            }
        }

        Ok(outcome)
    }
}
