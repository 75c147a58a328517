use std::collections::HashSet;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::catalog::models::{
    BouquetDetails, BouquetListQuery, BouquetRequest, BouquetSaveResponse, Category,
    CreateCategoryRequest, CreateFlowerRequest, CreatePackagingRequest, CreateSizeRequest, Flower,
    Packaging, PricedVariant, Size, UpdateCategoryRequest, UpdateFlowerRequest,
    UpdatePackagingRequest, UpdateSizeRequest, VariantInput,
};
use crate::catalog::repository::CatalogRepository;
use crate::error::ApiError;
use crate::pricing::{compute_variant_price, load_price_snapshot, CatalogPrices, UnresolvedReference};
use crate::validation::MAX_MONEY_AMOUNT;

/// Prices every variant from one snapshot of the referenced catalog rows.
///
/// Returns the rounded prices in input order and the distinct references
/// that priced at zero because their row is missing. A variant whose price
/// does not fit a stored money amount is a bad request.
pub async fn price_variants(
    prices: &dyn CatalogPrices,
    variants: &[VariantInput],
) -> Result<(Vec<PricedVariant>, Vec<UnresolvedReference>), ApiError> {
    let flower_lines: Vec<_> = variants.iter().flat_map(VariantInput::flower_lines).collect();
    let material_lines: Vec<_> = variants.iter().flat_map(VariantInput::material_lines).collect();
    let snapshot = load_price_snapshot(prices, &flower_lines, &material_lines).await?;

    let mut unresolved: Vec<UnresolvedReference> = Vec::new();
    let mut priced = Vec::with_capacity(variants.len());
    for input in variants {
        let price = compute_variant_price(
            &input.flower_lines(),
            &input.material_lines(),
            &snapshot,
            input.extra_charge,
            input.discount_percent,
        )
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
        .rounded();
        if price.price_before_discount > MAX_MONEY_AMOUNT {
            return Err(ApiError::BadRequest(format!(
                "Price of size {} exceeds {}",
                input.size_id, MAX_MONEY_AMOUNT
            )));
        }
        for reference in &price.unresolved {
            if !unresolved.contains(reference) {
                unresolved.push(reference.clone());
            }
        }
        priced.push(PricedVariant {
            input: input.clone(),
            price,
        });
    }

    Ok((priced, unresolved))
}

/// Structural checks the derive validators cannot express
pub fn check_bouquet_request(request: &BouquetRequest) -> Result<(), ApiError> {
    if request.translations.is_empty() {
        return Err(ApiError::BadRequest("At least one translation is required".to_string()));
    }
    if request.variants.is_empty() {
        return Err(ApiError::BadRequest("At least one size variant is required".to_string()));
    }

    let mut locales = HashSet::new();
    if !request
        .translations
        .iter()
        .all(|t| locales.insert(t.locale.trim().to_lowercase()))
    {
        return Err(ApiError::BadRequest("Each locale may only be translated once".to_string()));
    }

    let mut sizes = HashSet::new();
    if !request.variants.iter().all(|v| sizes.insert(v.size_id)) {
        return Err(ApiError::BadRequest("Each size may only have one variant".to_string()));
    }

    Ok(())
}

/// Service for catalog management and bouquet pricing
#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    strict_references: bool,
}

impl CatalogService {
    /// # Arguments
    /// * `strict_references` - Report composition lines pointing at missing
    ///   rows instead of silently pricing them at zero
    pub fn new(repo: CatalogRepository, strict_references: bool) -> Self {
        Self {
            repo,
            strict_references,
        }
    }

    // Flowers

    pub async fn list_flowers(&self, active: Option<bool>) -> Result<Vec<Flower>, ApiError> {
        let flowers = self.repo.list_flowers(active).await?;
        debug!("Retrieved {} flowers", flowers.len());
        Ok(flowers)
    }

    pub async fn get_flower(&self, id: i64) -> Result<Flower, ApiError> {
        self.repo
            .find_flower(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Flower", id))
    }

    pub async fn create_flower(&self, request: CreateFlowerRequest) -> Result<Flower, ApiError> {
        request.validate()?;
        let flower = self.repo.create_flower(&request).await?;
        info!("Created flower {} ({})", flower.sku, flower.name);
        Ok(flower)
    }

    /// Bouquet prices are not touched; use reprice to pick up the new price
    pub async fn update_flower(&self, id: i64, request: UpdateFlowerRequest) -> Result<Flower, ApiError> {
        request.validate()?;
        let flower = self
            .repo
            .update_flower(id, &request)
            .await?
            .ok_or_else(|| ApiError::not_found("Flower", id))?;
        info!("Updated flower {}", flower.sku);
        Ok(flower)
    }

    pub async fn delete_flower(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_flower(id).await? {
            return Err(ApiError::not_found("Flower", id));
        }
        info!("Deleted flower {}", id);
        Ok(())
    }

    // Packaging

    pub async fn list_packaging(&self, active: Option<bool>) -> Result<Vec<Packaging>, ApiError> {
        Ok(self.repo.list_packaging(active).await?)
    }

    pub async fn get_packaging(&self, id: i64) -> Result<Packaging, ApiError> {
        self.repo
            .find_packaging(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Packaging", id))
    }

    pub async fn create_packaging(&self, request: CreatePackagingRequest) -> Result<Packaging, ApiError> {
        request.validate()?;
        let packaging = self.repo.create_packaging(&request).await?;
        info!("Created packaging {} ({})", packaging.sku, packaging.name);
        Ok(packaging)
    }

    pub async fn update_packaging(
        &self,
        id: i64,
        request: UpdatePackagingRequest,
    ) -> Result<Packaging, ApiError> {
        request.validate()?;
        let packaging = self
            .repo
            .update_packaging(id, &request)
            .await?
            .ok_or_else(|| ApiError::not_found("Packaging", id))?;
        info!("Updated packaging {}", packaging.sku);
        Ok(packaging)
    }

    pub async fn delete_packaging(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_packaging(id).await? {
            return Err(ApiError::not_found("Packaging", id));
        }
        info!("Deleted packaging {}", id);
        Ok(())
    }

    // Sizes

    pub async fn list_sizes(&self) -> Result<Vec<Size>, ApiError> {
        self.repo.list_sizes().await
    }

    pub async fn create_size(&self, request: CreateSizeRequest) -> Result<Size, ApiError> {
        request.validate()?;
        let size = self.repo.create_size(&request).await?;
        info!("Created size {}", size.code);
        Ok(size)
    }

    pub async fn update_size(&self, id: i64, request: UpdateSizeRequest) -> Result<Size, ApiError> {
        request.validate()?;
        self.repo
            .update_size(id, &request)
            .await?
            .ok_or_else(|| ApiError::not_found("Size", id))
    }

    pub async fn delete_size(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_size(id).await? {
            return Err(ApiError::not_found("Size", id));
        }
        Ok(())
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.repo.list_categories().await
    }

    pub async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category, ApiError> {
        request.validate()?;
        let category = self.repo.create_category(&request).await?;
        info!("Created category {}", category.slug);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, ApiError> {
        request.validate()?;
        self.repo
            .update_category(id, &request)
            .await?
            .ok_or_else(|| ApiError::not_found("Category", id))
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_category(id).await? {
            return Err(ApiError::not_found("Category", id));
        }
        Ok(())
    }

    // Bouquets

    pub async fn list_bouquets(&self, query: &BouquetListQuery) -> Result<Vec<BouquetDetails>, ApiError> {
        let bouquets = self.repo.list_bouquets(query).await?;
        debug!("Retrieved {} bouquets", bouquets.len());
        Ok(bouquets)
    }

    pub async fn get_bouquet(&self, id: i64) -> Result<BouquetDetails, ApiError> {
        self.repo
            .find_bouquet(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Bouquet", id))
    }

    async fn price(&self, variants: &[VariantInput]) -> Result<(Vec<PricedVariant>, Vec<UnresolvedReference>), ApiError> {
        let (priced, unresolved) = price_variants(&self.repo, variants).await?;
        Ok((priced, self.report(unresolved)))
    }

    /// Logs unresolved references in strict mode; otherwise they are dropped
    fn report(&self, unresolved: Vec<UnresolvedReference>) -> Vec<UnresolvedReference> {
        if !self.strict_references {
            return Vec::new();
        }
        for reference in &unresolved {
            warn!(
                "Composition references missing {:?} {}, priced at 0",
                reference.kind, reference.id
            );
        }
        unresolved
    }

    pub async fn create_bouquet(&self, request: BouquetRequest) -> Result<BouquetSaveResponse, ApiError> {
        request.validate()?;
        check_bouquet_request(&request)?;

        let (priced, warnings) = self.price(&request.variants).await?;
        let id = self.repo.create_bouquet(&request, &priced).await?;
        let bouquet = self.get_bouquet(id).await?;
        info!(
            "Created bouquet {} with {} variants",
            bouquet.bouquet.sku,
            bouquet.variants.len()
        );

        Ok(BouquetSaveResponse { bouquet, warnings })
    }

    /// Replaces the bouquet definition, re-pricing every variant
    pub async fn update_bouquet(
        &self,
        id: i64,
        request: BouquetRequest,
    ) -> Result<BouquetSaveResponse, ApiError> {
        request.validate()?;
        check_bouquet_request(&request)?;

        let (priced, warnings) = self.price(&request.variants).await?;
        if !self.repo.update_bouquet(id, &request, &priced).await? {
            return Err(ApiError::not_found("Bouquet", id));
        }
        let bouquet = self.get_bouquet(id).await?;
        info!("Updated bouquet {}", bouquet.bouquet.sku);

        Ok(BouquetSaveResponse { bouquet, warnings })
    }

    /// Recomputes all variant prices from current flower and packaging prices
    pub async fn reprice_bouquet(&self, id: i64) -> Result<BouquetSaveResponse, ApiError> {
        let current = self.get_bouquet(id).await?;
        let inputs: Vec<VariantInput> = current.variants.iter().map(|v| v.input()).collect();

        let (priced, warnings) = self.price(&inputs).await?;
        let prices: Vec<_> = current
            .variants
            .iter()
            .zip(priced)
            .map(|(variant, priced)| (variant.id, priced.price))
            .collect();
        self.repo.update_variant_prices(id, &prices).await?;

        let bouquet = self.get_bouquet(id).await?;
        info!("Repriced {} variants of bouquet {}", prices.len(), bouquet.bouquet.sku);
        Ok(BouquetSaveResponse { bouquet, warnings })
    }

    pub async fn delete_bouquet(&self, id: i64) -> Result<(), ApiError> {
        if !self.repo.delete_bouquet(id).await? {
            return Err(ApiError::not_found("Bouquet", id));
        }
        info!("Deleted bouquet {}", id);
        Ok(())
    }
}
