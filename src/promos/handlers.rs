// HTTP handlers for promo endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::MaybeUser;
use crate::promos::{
    CreatePromoRequest, Promo, PromoError, PromoListQuery, PromoUsage, PromoValidationResponse,
    UpdatePromoRequest, ValidatePromoRequest,
};
use crate::AppState;

/// Handler for POST /api/promos/validate
/// Checks a code against an order amount without redeeming it
#[utoipa::path(
    post,
    path = "/api/promos/validate",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Promo evaluated; `valid` tells whether it applies", body = PromoValidationResponse),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Promo code not found", example = json!({"error_code": "PROMO_NOT_FOUND"}))
    ),
    tag = "promos"
)]
pub async fn validate_promo(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(request): Json<ValidatePromoRequest>,
) -> Result<Json<PromoValidationResponse>, PromoError> {
    let user_id = user.map(|u| u.user_id);
    let response = state.promos.validate(request, user_id).await?;
    Ok(Json(response))
}

/// Handler for GET /api/admin/promos
#[utoipa::path(
    get,
    path = "/api/admin/promos",
    params(PromoListQuery),
    responses(
        (status = 200, description = "Promos, newest first", body = Vec<Promo>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_promos(
    State(state): State<AppState>,
    Query(query): Query<PromoListQuery>,
) -> Result<Json<Vec<Promo>>, PromoError> {
    Ok(Json(state.promos.list(query.active).await?))
}

/// Handler for POST /api/admin/promos
#[utoipa::path(
    post,
    path = "/api/admin/promos",
    request_body = CreatePromoRequest,
    responses(
        (status = 201, description = "Promo created", body = Promo),
        (status = 400, description = "Invalid promo definition"),
        (status = 409, description = "Promo code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_promo(
    State(state): State<AppState>,
    Json(request): Json<CreatePromoRequest>,
) -> Result<(StatusCode, Json<Promo>), PromoError> {
    let promo = state.promos.create(request).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

/// Handler for GET /api/admin/promos/{id}
#[utoipa::path(
    get,
    path = "/api/admin/promos/{id}",
    params(("id" = i64, Path, description = "Promo ID")),
    responses(
        (status = 200, description = "Promo found", body = Promo),
        (status = 404, description = "Promo not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_promo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Promo>, PromoError> {
    Ok(Json(state.promos.get(id).await?))
}

/// Handler for PUT /api/admin/promos/{id}
#[utoipa::path(
    put,
    path = "/api/admin/promos/{id}",
    params(("id" = i64, Path, description = "Promo ID")),
    request_body = UpdatePromoRequest,
    responses(
        (status = 200, description = "Promo updated", body = Promo),
        (status = 400, description = "Invalid promo definition"),
        (status = 404, description = "Promo not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_promo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePromoRequest>,
) -> Result<Json<Promo>, PromoError> {
    Ok(Json(state.promos.update(id, request).await?))
}

/// Handler for DELETE /api/admin/promos/{id}
/// Promos are deactivated rather than removed so usages stay attached
#[utoipa::path(
    delete,
    path = "/api/admin/promos/{id}",
    params(("id" = i64, Path, description = "Promo ID")),
    responses(
        (status = 200, description = "Promo deactivated", body = Promo),
        (status = 404, description = "Promo not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn deactivate_promo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Promo>, PromoError> {
    Ok(Json(state.promos.deactivate(id).await?))
}

/// Handler for GET /api/admin/promos/{id}/usages
#[utoipa::path(
    get,
    path = "/api/admin/promos/{id}/usages",
    params(("id" = i64, Path, description = "Promo ID")),
    responses(
        (status = 200, description = "Redemptions, newest first", body = Vec<PromoUsage>),
        (status = 404, description = "Promo not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_promo_usages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PromoUsage>>, PromoError> {
    Ok(Json(state.promos.usages(id).await?))
}
