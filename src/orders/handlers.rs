// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, MaybeUser};
use crate::orders::{
    CreateOrderRequest, Order, OrderError, OrderHistoryQuery, OrderResponse, OrderSummary,
    UpdateDeliveryRequest, UpdateStatusRequest,
};
use crate::AppState;

/// Handler for POST /api/orders
/// Places an order; a bearer token is optional and enables the loyalty discount
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderSummary),
        (status = 400, description = "Invalid order", example = json!({"error_code": "VALIDATION_ERROR", "message": "Order must contain at least one item"})),
        (status = 401, description = "Invalid or expired token"),
        (status = 500, description = "Order could not be stored")
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderSummary>), OrderError> {
    let summary = state
        .orders
        .create_order(request, user.map(|u| u.user_id))
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Handler for GET /api/orders/my
/// Order history of the authenticated customer
#[utoipa::path(
    get,
    path = "/api/orders/my",
    params(OrderHistoryQuery),
    responses(
        (status = 200, description = "Orders, newest first", body = Vec<OrderResponse>),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_history_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .orders
        .list_my_orders(user.user_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another customer"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_by_id_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    // Ownership is checked in the service
    let order = state.orders.get_order(order_id, &user).await?;
    Ok(Json(order))
}

/// Handler for GET /api/admin/orders
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderHistoryQuery),
    responses(
        (status = 200, description = "All orders, newest first", body = Vec<Order>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_orders_handler(
    State(state): State<AppState>,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<Order>>, OrderError> {
    Ok(Json(state.orders.list_orders(query.status).await?))
}

/// Handler for PATCH /api/admin/orders/{order_id}/status
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{order_id}/status",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.orders.update_status(order_id, request.status).await?;
    Ok(Json(order))
}

/// Handler for PATCH /api/admin/orders/{order_id}/delivery
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{order_id}/delivery",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery details updated", body = OrderResponse),
        (status = 400, description = "Nothing to update or order is closed"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_delivery_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateDeliveryRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.orders.update_delivery(order_id, request).await?;
    Ok(Json(order))
}
