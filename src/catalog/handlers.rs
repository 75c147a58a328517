// HTTP handlers for the public catalog and its admin management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::catalog::{
    ActiveQuery, BouquetDetails, BouquetListQuery, BouquetRequest, BouquetSaveResponse, Category,
    CreateCategoryRequest, CreateFlowerRequest, CreatePackagingRequest, CreateSizeRequest, Flower,
    Packaging, Size, UpdateCategoryRequest, UpdateFlowerRequest, UpdatePackagingRequest,
    UpdateSizeRequest,
};
use crate::error::ApiError;
use crate::AppState;

// ============================================================================
// Public catalog
// ============================================================================

/// Handler for GET /api/flowers
/// Active flowers only
#[utoipa::path(
    get,
    path = "/api/flowers",
    responses((status = 200, description = "Active flowers", body = Vec<Flower>)),
    tag = "catalog"
)]
pub async fn list_flowers(State(state): State<AppState>) -> Result<Json<Vec<Flower>>, ApiError> {
    Ok(Json(state.catalog.list_flowers(Some(true)).await?))
}

/// Handler for GET /api/packaging
#[utoipa::path(
    get,
    path = "/api/packaging",
    responses((status = 200, description = "Active packaging", body = Vec<Packaging>)),
    tag = "catalog"
)]
pub async fn list_packaging(State(state): State<AppState>) -> Result<Json<Vec<Packaging>>, ApiError> {
    Ok(Json(state.catalog.list_packaging(Some(true)).await?))
}

/// Handler for GET /api/sizes
#[utoipa::path(
    get,
    path = "/api/sizes",
    responses((status = 200, description = "Sizes in display order", body = Vec<Size>)),
    tag = "catalog"
)]
pub async fn list_sizes(State(state): State<AppState>) -> Result<Json<Vec<Size>>, ApiError> {
    Ok(Json(state.catalog.list_sizes().await?))
}

/// Handler for GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = Vec<Category>)),
    tag = "catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// Handler for GET /api/bouquets
/// Active bouquets with translations and priced size variants
#[utoipa::path(
    get,
    path = "/api/bouquets",
    params(BouquetListQuery),
    responses((status = 200, description = "Active bouquets", body = Vec<BouquetDetails>)),
    tag = "catalog"
)]
pub async fn list_bouquets(
    State(state): State<AppState>,
    Query(query): Query<BouquetListQuery>,
) -> Result<Json<Vec<BouquetDetails>>, ApiError> {
    let query = BouquetListQuery {
        category_id: query.category_id,
        active: Some(true),
    };
    Ok(Json(state.catalog.list_bouquets(&query).await?))
}

/// Handler for GET /api/bouquets/{id}
/// Inactive bouquets are hidden from the storefront
#[utoipa::path(
    get,
    path = "/api/bouquets/{id}",
    params(("id" = i64, Path, description = "Bouquet ID")),
    responses(
        (status = 200, description = "Bouquet found", body = BouquetDetails),
        (status = 404, description = "Bouquet not found")
    ),
    tag = "catalog"
)]
pub async fn get_bouquet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BouquetDetails>, ApiError> {
    let bouquet = state.catalog.get_bouquet(id).await?;
    if !bouquet.bouquet.is_active {
        return Err(ApiError::not_found("Bouquet", id));
    }
    Ok(Json(bouquet))
}

// ============================================================================
// Admin: flowers
// ============================================================================

/// Handler for GET /api/admin/flowers
#[utoipa::path(
    get,
    path = "/api/admin/flowers",
    params(ActiveQuery),
    responses((status = 200, description = "Flowers including inactive", body = Vec<Flower>)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_list_flowers(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<Flower>>, ApiError> {
    Ok(Json(state.catalog.list_flowers(query.active).await?))
}

/// Handler for GET /api/admin/flowers/{id}
#[utoipa::path(
    get,
    path = "/api/admin/flowers/{id}",
    params(("id" = i64, Path, description = "Flower ID")),
    responses(
        (status = 200, description = "Flower found", body = Flower),
        (status = 404, description = "Flower not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_flower(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Flower>, ApiError> {
    Ok(Json(state.catalog.get_flower(id).await?))
}

/// Handler for POST /api/admin/flowers
/// The SKU is assigned from the FLW sequence
#[utoipa::path(
    post,
    path = "/api/admin/flowers",
    request_body = CreateFlowerRequest,
    responses(
        (status = 201, description = "Flower created", body = Flower),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_flower(
    State(state): State<AppState>,
    Json(request): Json<CreateFlowerRequest>,
) -> Result<(StatusCode, Json<Flower>), ApiError> {
    let flower = state.catalog.create_flower(request).await?;
    Ok((StatusCode::CREATED, Json(flower)))
}

/// Handler for PUT /api/admin/flowers/{id}
#[utoipa::path(
    put,
    path = "/api/admin/flowers/{id}",
    params(("id" = i64, Path, description = "Flower ID")),
    request_body = UpdateFlowerRequest,
    responses(
        (status = 200, description = "Flower updated", body = Flower),
        (status = 404, description = "Flower not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_flower(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateFlowerRequest>,
) -> Result<Json<Flower>, ApiError> {
    Ok(Json(state.catalog.update_flower(id, request).await?))
}

/// Handler for DELETE /api/admin/flowers/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/flowers/{id}",
    params(("id" = i64, Path, description = "Flower ID")),
    responses(
        (status = 204, description = "Flower deleted"),
        (status = 404, description = "Flower not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_flower(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_flower(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: packaging
// ============================================================================

/// Handler for GET /api/admin/packaging
#[utoipa::path(
    get,
    path = "/api/admin/packaging",
    params(ActiveQuery),
    responses((status = 200, description = "Packaging including inactive", body = Vec<Packaging>)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_list_packaging(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<Packaging>>, ApiError> {
    Ok(Json(state.catalog.list_packaging(query.active).await?))
}

/// Handler for GET /api/admin/packaging/{id}
#[utoipa::path(
    get,
    path = "/api/admin/packaging/{id}",
    params(("id" = i64, Path, description = "Packaging ID")),
    responses(
        (status = 200, description = "Packaging found", body = Packaging),
        (status = 404, description = "Packaging not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_packaging(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Packaging>, ApiError> {
    Ok(Json(state.catalog.get_packaging(id).await?))
}

/// Handler for POST /api/admin/packaging
#[utoipa::path(
    post,
    path = "/api/admin/packaging",
    request_body = CreatePackagingRequest,
    responses(
        (status = 201, description = "Packaging created", body = Packaging),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_packaging(
    State(state): State<AppState>,
    Json(request): Json<CreatePackagingRequest>,
) -> Result<(StatusCode, Json<Packaging>), ApiError> {
    let packaging = state.catalog.create_packaging(request).await?;
    Ok((StatusCode::CREATED, Json(packaging)))
}

/// Handler for PUT /api/admin/packaging/{id}
#[utoipa::path(
    put,
    path = "/api/admin/packaging/{id}",
    params(("id" = i64, Path, description = "Packaging ID")),
    request_body = UpdatePackagingRequest,
    responses(
        (status = 200, description = "Packaging updated", body = Packaging),
        (status = 404, description = "Packaging not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_packaging(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePackagingRequest>,
) -> Result<Json<Packaging>, ApiError> {
    Ok(Json(state.catalog.update_packaging(id, request).await?))
}

/// Handler for DELETE /api/admin/packaging/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/packaging/{id}",
    params(("id" = i64, Path, description = "Packaging ID")),
    responses(
        (status = 204, description = "Packaging deleted"),
        (status = 404, description = "Packaging not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_packaging(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_packaging(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: sizes and categories
// ============================================================================

/// Handler for POST /api/admin/sizes
#[utoipa::path(
    post,
    path = "/api/admin/sizes",
    request_body = CreateSizeRequest,
    responses(
        (status = 201, description = "Size created", body = Size),
        (status = 409, description = "Size code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_size(
    State(state): State<AppState>,
    Json(request): Json<CreateSizeRequest>,
) -> Result<(StatusCode, Json<Size>), ApiError> {
    let size = state.catalog.create_size(request).await?;
    Ok((StatusCode::CREATED, Json(size)))
}

/// Handler for PUT /api/admin/sizes/{id}
#[utoipa::path(
    put,
    path = "/api/admin/sizes/{id}",
    params(("id" = i64, Path, description = "Size ID")),
    request_body = UpdateSizeRequest,
    responses(
        (status = 200, description = "Size updated", body = Size),
        (status = 404, description = "Size not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateSizeRequest>,
) -> Result<Json<Size>, ApiError> {
    Ok(Json(state.catalog.update_size(id, request).await?))
}

/// Handler for DELETE /api/admin/sizes/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/sizes/{id}",
    params(("id" = i64, Path, description = "Size ID")),
    responses(
        (status = 204, description = "Size deleted"),
        (status = 404, description = "Size not found"),
        (status = 409, description = "Size is used by a bouquet variant")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_size(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/admin/categories
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Slug already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.catalog.create_category(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for PUT /api/admin/categories/{id}
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.update_category(id, request).await?))
}

/// Handler for DELETE /api/admin/categories/{id}
/// Bouquets in the category keep existing without one
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin: bouquets
// ============================================================================

/// Handler for GET /api/admin/bouquets
#[utoipa::path(
    get,
    path = "/api/admin/bouquets",
    params(BouquetListQuery),
    responses((status = 200, description = "Bouquets including inactive", body = Vec<BouquetDetails>)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_list_bouquets(
    State(state): State<AppState>,
    Query(query): Query<BouquetListQuery>,
) -> Result<Json<Vec<BouquetDetails>>, ApiError> {
    Ok(Json(state.catalog.list_bouquets(&query).await?))
}

/// Handler for GET /api/admin/bouquets/{id}
#[utoipa::path(
    get,
    path = "/api/admin/bouquets/{id}",
    params(("id" = i64, Path, description = "Bouquet ID")),
    responses(
        (status = 200, description = "Bouquet found", body = BouquetDetails),
        (status = 404, description = "Bouquet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_get_bouquet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BouquetDetails>, ApiError> {
    Ok(Json(state.catalog.get_bouquet(id).await?))
}

/// Handler for POST /api/admin/bouquets
/// Variant prices are computed from the composition
#[utoipa::path(
    post,
    path = "/api/admin/bouquets",
    request_body = BouquetRequest,
    responses(
        (status = 201, description = "Bouquet created", body = BouquetSaveResponse),
        (status = 400, description = "Invalid definition")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_bouquet(
    State(state): State<AppState>,
    Json(request): Json<BouquetRequest>,
) -> Result<(StatusCode, Json<BouquetSaveResponse>), ApiError> {
    let saved = state.catalog.create_bouquet(request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Handler for PUT /api/admin/bouquets/{id}
/// Replaces translations, variants and composition
#[utoipa::path(
    put,
    path = "/api/admin/bouquets/{id}",
    params(("id" = i64, Path, description = "Bouquet ID")),
    request_body = BouquetRequest,
    responses(
        (status = 200, description = "Bouquet replaced", body = BouquetSaveResponse),
        (status = 400, description = "Invalid definition"),
        (status = 404, description = "Bouquet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_bouquet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<BouquetRequest>,
) -> Result<Json<BouquetSaveResponse>, ApiError> {
    Ok(Json(state.catalog.update_bouquet(id, request).await?))
}

/// Handler for POST /api/admin/bouquets/{id}/reprice
/// Recomputes variant prices after flower or packaging price changes
#[utoipa::path(
    post,
    path = "/api/admin/bouquets/{id}/reprice",
    params(("id" = i64, Path, description = "Bouquet ID")),
    responses(
        (status = 200, description = "Prices recomputed", body = BouquetSaveResponse),
        (status = 404, description = "Bouquet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reprice_bouquet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BouquetSaveResponse>, ApiError> {
    Ok(Json(state.catalog.reprice_bouquet(id).await?))
}

/// Handler for DELETE /api/admin/bouquets/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/bouquets/{id}",
    params(("id" = i64, Path, description = "Bouquet ID")),
    responses(
        (status = 204, description = "Bouquet deleted"),
        (status = 404, description = "Bouquet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_bouquet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_bouquet(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
