use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;

use crate::catalog::models::{
    Bouquet, BouquetDetails, BouquetListQuery, BouquetRequest, BouquetTranslation, BouquetVariant,
    Category, CompositionItem, CompositionRow, CreateCategoryRequest, CreateFlowerRequest,
    CreatePackagingRequest, CreateSizeRequest, Flower, Packaging, PricedVariant, Size,
    TranslationInput, UpdateCategoryRequest, UpdateFlowerRequest, UpdatePackagingRequest,
    UpdateSizeRequest, VariantRow,
};
use crate::db::next_sequence_number;
use crate::error::ApiError;
use crate::orders::OrderItemType;
use crate::pricing::{CatalogPrices, VariantPrice};
use crate::store::{CatalogLookup, ResolvedItem, StoreError};

const FLOWER_COLUMNS: &str = "id, sku, name, price, cost, color, is_active, created_at, updated_at";
const PACKAGING_COLUMNS: &str =
    "id, sku, name, price_per_unit, cost, is_active, created_at, updated_at";
const BOUQUET_COLUMNS: &str = "id, sku, category_id, image_urls, is_active, created_at, updated_at";

/// Repository for catalog entities
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Flowers

    pub async fn list_flowers(&self, active: Option<bool>) -> Result<Vec<Flower>, ApiError> {
        let flowers = sqlx::query_as::<_, Flower>(&format!(
            "SELECT {} FROM flowers WHERE ($1::BOOLEAN IS NULL OR is_active = $1) ORDER BY name, id",
            FLOWER_COLUMNS
        ))
        .bind(active)
        .fetch_all(&self.pool)
        .await?;

        Ok(flowers)
    }

    pub async fn find_flower(&self, id: i64) -> Result<Option<Flower>, ApiError> {
        let flower = sqlx::query_as::<_, Flower>(&format!(
            "SELECT {} FROM flowers WHERE id = $1",
            FLOWER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(flower)
    }

    /// Inserts a flower with the next `FLW-` SKU
    pub async fn create_flower(&self, request: &CreateFlowerRequest) -> Result<Flower, ApiError> {
        let mut tx = self.pool.begin().await?;
        let sku = next_sequence_number(&mut tx, "FLW").await?;

        let flower = sqlx::query_as::<_, Flower>(&format!(
            r#"
            INSERT INTO flowers (sku, name, price, cost, color, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            FLOWER_COLUMNS
        ))
        .bind(&sku)
        .bind(request.name.trim())
        .bind(request.price)
        .bind(request.cost)
        .bind(&request.color)
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(flower)
    }

    pub async fn update_flower(
        &self,
        id: i64,
        request: &UpdateFlowerRequest,
    ) -> Result<Option<Flower>, ApiError> {
        let flower = sqlx::query_as::<_, Flower>(&format!(
            r#"
            UPDATE flowers
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                cost = COALESCE($4, cost),
                color = COALESCE($5, color),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FLOWER_COLUMNS
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.price)
        .bind(request.cost)
        .bind(&request.color)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(flower)
    }

    pub async fn delete_flower(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM flowers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Packaging

    pub async fn list_packaging(&self, active: Option<bool>) -> Result<Vec<Packaging>, ApiError> {
        let packaging = sqlx::query_as::<_, Packaging>(&format!(
            "SELECT {} FROM packaging WHERE ($1::BOOLEAN IS NULL OR is_active = $1) ORDER BY name, id",
            PACKAGING_COLUMNS
        ))
        .bind(active)
        .fetch_all(&self.pool)
        .await?;

        Ok(packaging)
    }

    pub async fn find_packaging(&self, id: i64) -> Result<Option<Packaging>, ApiError> {
        let packaging = sqlx::query_as::<_, Packaging>(&format!(
            "SELECT {} FROM packaging WHERE id = $1",
            PACKAGING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(packaging)
    }

    /// Inserts packaging with the next `PKG-` SKU
    pub async fn create_packaging(&self, request: &CreatePackagingRequest) -> Result<Packaging, ApiError> {
        let mut tx = self.pool.begin().await?;
        let sku = next_sequence_number(&mut tx, "PKG").await?;

        let packaging = sqlx::query_as::<_, Packaging>(&format!(
            r#"
            INSERT INTO packaging (sku, name, price_per_unit, cost, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PACKAGING_COLUMNS
        ))
        .bind(&sku)
        .bind(request.name.trim())
        .bind(request.price_per_unit)
        .bind(request.cost)
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(packaging)
    }

    pub async fn update_packaging(
        &self,
        id: i64,
        request: &UpdatePackagingRequest,
    ) -> Result<Option<Packaging>, ApiError> {
        let packaging = sqlx::query_as::<_, Packaging>(&format!(
            r#"
            UPDATE packaging
            SET name = COALESCE($2, name),
                price_per_unit = COALESCE($3, price_per_unit),
                cost = COALESCE($4, cost),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PACKAGING_COLUMNS
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.price_per_unit)
        .bind(request.cost)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(packaging)
    }

    pub async fn delete_packaging(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM packaging WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Sizes

    pub async fn list_sizes(&self) -> Result<Vec<Size>, ApiError> {
        let sizes = sqlx::query_as::<_, Size>(
            "SELECT id, code, name, sort_order FROM sizes ORDER BY sort_order, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sizes)
    }

    pub async fn create_size(&self, request: &CreateSizeRequest) -> Result<Size, ApiError> {
        let size = sqlx::query_as::<_, Size>(
            r#"
            INSERT INTO sizes (code, name, sort_order)
            VALUES ($1, $2, $3)
            RETURNING id, code, name, sort_order
            "#,
        )
        .bind(request.code.trim().to_uppercase())
        .bind(request.name.trim())
        .bind(request.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;

        Ok(size)
    }

    pub async fn update_size(&self, id: i64, request: &UpdateSizeRequest) -> Result<Option<Size>, ApiError> {
        let size = sqlx::query_as::<_, Size>(
            r#"
            UPDATE sizes
            SET code = COALESCE($2, code),
                name = COALESCE($3, name),
                sort_order = COALESCE($4, sort_order)
            WHERE id = $1
            RETURNING id, code, name, sort_order
            "#,
        )
        .bind(id)
        .bind(request.code.as_deref().map(|c| c.trim().to_uppercase()))
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(size)
    }

    /// Fails with a conflict while any variant still uses the size
    pub async fn delete_size(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM sizes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, slug, name FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    pub async fn create_category(&self, request: &CreateCategoryRequest) -> Result<Category, ApiError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (slug, name) VALUES ($1, $2) RETURNING id, slug, name",
        )
        .bind(&request.slug)
        .bind(request.name.trim())
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        request: &UpdateCategoryRequest,
    ) -> Result<Option<Category>, ApiError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET slug = COALESCE($2, slug), name = COALESCE($3, name)
            WHERE id = $1
            RETURNING id, slug, name
            "#,
        )
        .bind(id)
        .bind(&request.slug)
        .bind(request.name.as_deref().map(str::trim))
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Bouquets of a deleted category become uncategorized
    pub async fn delete_category(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Bouquets

    pub async fn list_bouquets(&self, query: &BouquetListQuery) -> Result<Vec<BouquetDetails>, ApiError> {
        let bouquets = sqlx::query_as::<_, Bouquet>(&format!(
            r#"
            SELECT {}
            FROM bouquets
            WHERE ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY id
            "#,
            BOUQUET_COLUMNS
        ))
        .bind(query.category_id)
        .bind(query.active)
        .fetch_all(&self.pool)
        .await?;

        self.load_details(bouquets).await
    }

    pub async fn find_bouquet(&self, id: i64) -> Result<Option<BouquetDetails>, ApiError> {
        let bouquet = sqlx::query_as::<_, Bouquet>(&format!(
            "SELECT {} FROM bouquets WHERE id = $1",
            BOUQUET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(bouquet) = bouquet else {
            return Ok(None);
        };
        Ok(self.load_details(vec![bouquet]).await?.pop())
    }

    /// Attaches translations, variants and composition to bouquets with one
    /// query per table
    async fn load_details(&self, bouquets: Vec<Bouquet>) -> Result<Vec<BouquetDetails>, ApiError> {
        if bouquets.is_empty() {
            return Ok(Vec::new());
        }
        let bouquet_ids: Vec<i64> = bouquets.iter().map(|b| b.id).collect();

        let translations = sqlx::query_as::<_, BouquetTranslation>(
            r#"
            SELECT bouquet_id, locale, name, description
            FROM bouquet_translations
            WHERE bouquet_id = ANY($1)
            ORDER BY bouquet_id, locale
            "#,
        )
        .bind(&bouquet_ids)
        .fetch_all(&self.pool)
        .await?;

        let variants = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT v.id, v.bouquet_id, v.size_id, v.flower_count, v.price_base, v.extra_charge,
                   v.discount_percent, v.price, v.price_old
            FROM bouquet_size_variants v
            JOIN sizes s ON s.id = v.size_id
            WHERE v.bouquet_id = ANY($1)
            ORDER BY v.bouquet_id, s.sort_order, v.id
            "#,
        )
        .bind(&bouquet_ids)
        .fetch_all(&self.pool)
        .await?;

        let variant_ids: Vec<i64> = variants.iter().map(|v| v.id).collect();
        let flowers = sqlx::query_as::<_, CompositionRow>(
            r#"
            SELECT variant_id, flower_id AS item_id, quantity
            FROM variant_flowers
            WHERE variant_id = ANY($1)
            ORDER BY variant_id, flower_id
            "#,
        )
        .bind(&variant_ids)
        .fetch_all(&self.pool)
        .await?;
        let materials = sqlx::query_as::<_, CompositionRow>(
            r#"
            SELECT variant_id, packaging_id AS item_id, quantity
            FROM variant_materials
            WHERE variant_id = ANY($1)
            ORDER BY variant_id, packaging_id
            "#,
        )
        .bind(&variant_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_details(bouquets, translations, variants, flowers, materials))
    }

    /// Inserts a bouquet with the next `BQT-` SKU, its translations and its
    /// priced variants in one transaction
    pub async fn create_bouquet(
        &self,
        request: &BouquetRequest,
        variants: &[PricedVariant],
    ) -> Result<i64, ApiError> {
        let mut tx = self.pool.begin().await?;
        let sku = next_sequence_number(&mut tx, "BQT").await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bouquets (sku, category_id, image_urls, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&sku)
        .bind(request.category_id)
        .bind(&request.image_urls)
        .bind(request.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        insert_contents(&mut tx, id, &request.translations, variants).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Replaces a bouquet's fields, translations, variants and composition.
    ///
    /// Existing child rows are deleted and re-inserted in the same
    /// transaction. Returns `false` when the bouquet does not exist.
    pub async fn update_bouquet(
        &self,
        id: i64,
        request: &BouquetRequest,
        variants: &[PricedVariant],
    ) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE bouquets
            SET category_id = $2, image_urls = $3, is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(request.category_id)
        .bind(&request.image_urls)
        .bind(request.is_active)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM bouquet_translations WHERE bouquet_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        // Composition rows cascade with their variant
        sqlx::query("DELETE FROM bouquet_size_variants WHERE bouquet_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_contents(&mut tx, id, &request.translations, variants).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Stores recomputed prices for existing variants
    pub async fn update_variant_prices(
        &self,
        bouquet_id: i64,
        prices: &[(i64, VariantPrice)],
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        for (variant_id, price) in prices {
            sqlx::query(
                r#"
                UPDATE bouquet_size_variants
                SET price_base = $3, price = $4, price_old = $5
                WHERE id = $1 AND bouquet_id = $2
                "#,
            )
            .bind(variant_id)
            .bind(bouquet_id)
            .bind(price.price_base)
            .bind(price.price)
            .bind(price.price_old)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE bouquets SET updated_at = NOW() WHERE id = $1")
            .bind(bouquet_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_bouquet(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM bouquets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_contents(
    tx: &mut Transaction<'_, Postgres>,
    bouquet_id: i64,
    translations: &[TranslationInput],
    variants: &[PricedVariant],
) -> Result<(), sqlx::Error> {
    for translation in translations {
        sqlx::query(
            r#"
            INSERT INTO bouquet_translations (bouquet_id, locale, name, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(bouquet_id)
        .bind(translation.locale.trim().to_lowercase())
        .bind(translation.name.trim())
        .bind(&translation.description)
        .execute(&mut **tx)
        .await?;
    }

    for variant in variants {
        let input = &variant.input;
        let variant_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bouquet_size_variants (bouquet_id, size_id, flower_count, price_base,
                extra_charge, discount_percent, price, price_old)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(bouquet_id)
        .bind(input.size_id)
        .bind(input.flower_count)
        .bind(variant.price.price_base)
        .bind(input.extra_charge)
        .bind(input.discount_percent)
        .bind(variant.price.price)
        .bind(variant.price.price_old)
        .fetch_one(&mut **tx)
        .await?;

        for line in &input.flowers {
            sqlx::query("INSERT INTO variant_flowers (variant_id, flower_id, quantity) VALUES ($1, $2, $3)")
                .bind(variant_id)
                .bind(line.id)
                .bind(line.quantity)
                .execute(&mut **tx)
                .await?;
        }
        for line in &input.materials {
            sqlx::query("INSERT INTO variant_materials (variant_id, packaging_id, quantity) VALUES ($1, $2, $3)")
                .bind(variant_id)
                .bind(line.id)
                .bind(line.quantity)
                .execute(&mut **tx)
                .await?;
        }
    }

    Ok(())
}

/// Groups child rows under their bouquets, keeping the query order
pub(crate) fn assemble_details(
    bouquets: Vec<Bouquet>,
    translations: Vec<BouquetTranslation>,
    variants: Vec<VariantRow>,
    flowers: Vec<CompositionRow>,
    materials: Vec<CompositionRow>,
) -> Vec<BouquetDetails> {
    let mut flowers_by_variant: HashMap<i64, Vec<CompositionItem>> = HashMap::new();
    for row in flowers {
        flowers_by_variant.entry(row.variant_id).or_default().push(CompositionItem {
            id: row.item_id,
            quantity: row.quantity,
        });
    }
    let mut materials_by_variant: HashMap<i64, Vec<CompositionItem>> = HashMap::new();
    for row in materials {
        materials_by_variant.entry(row.variant_id).or_default().push(CompositionItem {
            id: row.item_id,
            quantity: row.quantity,
        });
    }

    let mut variants_by_bouquet: HashMap<i64, Vec<BouquetVariant>> = HashMap::new();
    for row in variants {
        variants_by_bouquet.entry(row.bouquet_id).or_default().push(BouquetVariant {
            id: row.id,
            size_id: row.size_id,
            flower_count: row.flower_count,
            price_base: row.price_base,
            extra_charge: row.extra_charge,
            discount_percent: row.discount_percent,
            price: row.price,
            price_old: row.price_old,
            flowers: flowers_by_variant.remove(&row.id).unwrap_or_default(),
            materials: materials_by_variant.remove(&row.id).unwrap_or_default(),
        });
    }

    let mut translations_by_bouquet: HashMap<i64, Vec<BouquetTranslation>> = HashMap::new();
    for translation in translations {
        translations_by_bouquet
            .entry(translation.bouquet_id)
            .or_default()
            .push(translation);
    }

    bouquets
        .into_iter()
        .map(|bouquet| BouquetDetails {
            translations: translations_by_bouquet.remove(&bouquet.id).unwrap_or_default(),
            variants: variants_by_bouquet.remove(&bouquet.id).unwrap_or_default(),
            bouquet,
        })
        .collect()
}

#[async_trait]
impl CatalogPrices for CatalogRepository {
    async fn flower_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError> {
        let rows: Vec<(i64, Decimal)> = sqlx::query_as("SELECT id, price FROM flowers WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn packaging_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError> {
        let rows: Vec<(i64, Decimal)> =
            sqlx::query_as("SELECT id, price_per_unit FROM packaging WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl CatalogLookup for CatalogRepository {
    async fn resolve_skus(&self, skus: &[String]) -> Result<HashMap<String, ResolvedItem>, StoreError> {
        let rows: Vec<(String, OrderItemType, i64)> = sqlx::query_as(
            r#"
            SELECT sku, 'FLOWER'::TEXT AS item_type, id FROM flowers WHERE sku = ANY($1)
            UNION ALL
            SELECT sku, 'PACKAGING', id FROM packaging WHERE sku = ANY($1)
            UNION ALL
            SELECT sku, 'BOUQUET', id FROM bouquets WHERE sku = ANY($1)
            "#,
        )
        .bind(skus)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sku, item_type, item_id)| (sku, ResolvedItem { item_type, item_id }))
            .collect())
    }
}
