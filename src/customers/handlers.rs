// HTTP handlers for admin customer endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::customers::{Customer, CustomerListQuery};
use crate::error::ApiError;
use crate::AppState;

/// Handler for GET /api/admin/customers
#[utoipa::path(
    get,
    path = "/api/admin/customers",
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Customers with loyalty aggregates", body = Vec<Customer>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state.customers.list(query.status).await?;
    tracing::debug!("Retrieved {} customers", customers.len());
    Ok(Json(customers))
}

/// Handler for GET /api/admin/customers/{id}
#[utoipa::path(
    get,
    path = "/api/admin/customers/{id}",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer found", body = Customer),
        (status = 404, description = "Customer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customers.get(id).await?))
}

/// Handler for POST /api/admin/customers/{id}/recalculate
/// Rebuilds order count, spend and tier from the customer's orders
#[utoipa::path(
    post,
    path = "/api/admin/customers/{id}/recalculate",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Aggregates recalculated", body = Customer),
        (status = 404, description = "Customer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn recalculate_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, ApiError> {
    Ok(Json(state.customers.recalculate(id).await?))
}
