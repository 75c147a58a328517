// Flower Shop API: catalog with composition-based pricing, promo codes,
// loyalty tiers and checkout

pub mod auth;
pub mod catalog;
pub mod config;
pub mod customers;
pub mod db;
pub mod error;
pub mod loyalty;
pub mod orders;
pub mod pricing;
pub mod promos;
pub mod store;
pub mod validation;

use axum::{
    extract::FromRef,
    middleware,
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{require_admin, TokenService};
use catalog::{CatalogRepository, CatalogService};
use config::AppConfig;
use customers::{CustomerRepository, CustomerService};
use orders::{OrderRepository, OrderService};
use promos::{PromoRepository, PromoService};
use store::MemoryStore;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::handlers::list_flowers,
        catalog::handlers::list_packaging,
        catalog::handlers::list_sizes,
        catalog::handlers::list_categories,
        catalog::handlers::list_bouquets,
        catalog::handlers::get_bouquet,
        catalog::handlers::admin_list_flowers,
        catalog::handlers::get_flower,
        catalog::handlers::create_flower,
        catalog::handlers::update_flower,
        catalog::handlers::delete_flower,
        catalog::handlers::admin_list_packaging,
        catalog::handlers::get_packaging,
        catalog::handlers::create_packaging,
        catalog::handlers::update_packaging,
        catalog::handlers::delete_packaging,
        catalog::handlers::create_size,
        catalog::handlers::update_size,
        catalog::handlers::delete_size,
        catalog::handlers::create_category,
        catalog::handlers::update_category,
        catalog::handlers::delete_category,
        catalog::handlers::admin_list_bouquets,
        catalog::handlers::admin_get_bouquet,
        catalog::handlers::create_bouquet,
        catalog::handlers::update_bouquet,
        catalog::handlers::reprice_bouquet,
        catalog::handlers::delete_bouquet,
        promos::handlers::validate_promo,
        promos::handlers::list_promos,
        promos::handlers::create_promo,
        promos::handlers::get_promo,
        promos::handlers::update_promo,
        promos::handlers::deactivate_promo,
        promos::handlers::list_promo_usages,
        orders::handlers::create_order_handler,
        orders::handlers::get_order_history_handler,
        orders::handlers::get_order_by_id_handler,
        orders::handlers::list_orders_handler,
        orders::handlers::update_order_status_handler,
        orders::handlers::update_delivery_handler,
        customers::handlers::list_customers,
        customers::handlers::get_customer,
        customers::handlers::recalculate_customer,
    ),
    components(
        schemas(
            catalog::Flower, catalog::CreateFlowerRequest, catalog::UpdateFlowerRequest,
            catalog::Packaging, catalog::CreatePackagingRequest, catalog::UpdatePackagingRequest,
            catalog::Size, catalog::CreateSizeRequest, catalog::UpdateSizeRequest,
            catalog::Category, catalog::CreateCategoryRequest, catalog::UpdateCategoryRequest,
            catalog::Bouquet, catalog::BouquetTranslation, catalog::BouquetVariant,
            catalog::CompositionItem, catalog::BouquetDetails, catalog::BouquetSaveResponse,
            catalog::TranslationInput, catalog::VariantInput, catalog::BouquetRequest,
            pricing::UnresolvedReference, pricing::ReferenceKind,
            promos::Promo, promos::PromoUsage, promos::PromoType, promos::DiscountType,
            promos::CreatePromoRequest, promos::UpdatePromoRequest, promos::ValidatePromoRequest,
            promos::PromoValidationResponse, promos::PromoRejection,
            orders::Order, orders::OrderItem, orders::OrderStatus, orders::OrderItemType,
            orders::CustomerInfo, orders::DeliveryInfo, orders::LineItemRequest,
            orders::CreateOrderRequest, orders::UpdateStatusRequest, orders::UpdateDeliveryRequest,
            orders::OrderResponse, orders::OrderSummary, orders::DiscountBreakdown,
            customers::Customer, loyalty::CustomerStatus, auth::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Public flower and bouquet catalog"),
        (name = "promos", description = "Promo code validation"),
        (name = "orders", description = "Checkout and order history"),
        (name = "admin", description = "Back-office management, ADMIN role required")
    ),
    info(
        title = "Flower Shop API",
        version = "1.0.0",
        description = "RESTful API for the flower shop catalog, promotions and orders"
    )
)]
pub struct ApiDoc;

/// Registers the bearer JWT scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub token_service: Arc<TokenService>,
    pub catalog: CatalogService,
    pub promos: PromoService,
    pub orders: OrderService,
    pub customers: CustomerService,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

impl AppState {
    /// State backed entirely by PostgreSQL
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let catalog_repo = CatalogRepository::new(db.clone());
        let customer_repo = Arc::new(CustomerRepository::new(db.clone()));
        let promos = PromoService::new(Arc::new(PromoRepository::new(db.clone())));
        let orders = OrderService::new(
            Arc::new(catalog_repo.clone()),
            customer_repo.clone(),
            promos.clone(),
            Arc::new(OrderRepository::new(db.clone())),
        );

        Self {
            token_service: Arc::new(TokenService::new(&config.jwt_secret)),
            catalog: CatalogService::new(catalog_repo, config.pricing_strict_references),
            customers: CustomerService::new(customer_repo),
            promos,
            orders,
            config: Arc::new(config),
            db,
        }
    }

    /// State whose checkout, promo and customer flows run on `store`.
    ///
    /// Catalog management still goes through `db`; a lazily connected pool
    /// is enough when those routes are not used.
    pub fn with_memory_store(db: PgPool, config: AppConfig, store: Arc<MemoryStore>) -> Self {
        let promos = PromoService::new(store.clone());
        let orders = OrderService::new(store.clone(), store.clone(), promos.clone(), store.clone());

        Self {
            token_service: Arc::new(TokenService::new(&config.jwt_secret)),
            catalog: CatalogService::new(
                CatalogRepository::new(db.clone()),
                config.pricing_strict_references,
            ),
            customers: CustomerService::new(store),
            promos,
            orders,
            config: Arc::new(config),
            db,
        }
    }
}

/// Handler for GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router with public, customer and admin routes
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route(
            "/api/admin/flowers",
            get(catalog::admin_list_flowers).post(catalog::create_flower),
        )
        .route(
            "/api/admin/flowers/:id",
            get(catalog::get_flower)
                .put(catalog::update_flower)
                .delete(catalog::delete_flower),
        )
        .route(
            "/api/admin/packaging",
            get(catalog::admin_list_packaging).post(catalog::create_packaging),
        )
        .route(
            "/api/admin/packaging/:id",
            get(catalog::get_packaging)
                .put(catalog::update_packaging)
                .delete(catalog::delete_packaging),
        )
        .route("/api/admin/sizes", post(catalog::create_size))
        .route(
            "/api/admin/sizes/:id",
            put(catalog::update_size).delete(catalog::delete_size),
        )
        .route("/api/admin/categories", post(catalog::create_category))
        .route(
            "/api/admin/categories/:id",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route(
            "/api/admin/bouquets",
            get(catalog::admin_list_bouquets).post(catalog::create_bouquet),
        )
        .route(
            "/api/admin/bouquets/:id",
            get(catalog::admin_get_bouquet)
                .put(catalog::update_bouquet)
                .delete(catalog::delete_bouquet),
        )
        .route("/api/admin/bouquets/:id/reprice", post(catalog::reprice_bouquet))
        .route(
            "/api/admin/promos",
            get(promos::list_promos).post(promos::create_promo),
        )
        .route(
            "/api/admin/promos/:id",
            get(promos::get_promo)
                .put(promos::update_promo)
                .delete(promos::deactivate_promo),
        )
        .route("/api/admin/promos/:id/usages", get(promos::list_promo_usages))
        .route("/api/admin/orders", get(orders::list_orders_handler))
        .route(
            "/api/admin/orders/:order_id/status",
            patch(orders::update_order_status_handler),
        )
        .route(
            "/api/admin/orders/:order_id/delivery",
            patch(orders::update_delivery_handler),
        )
        .route("/api/admin/customers", get(customers::list_customers))
        .route("/api/admin/customers/:id", get(customers::get_customer))
        .route(
            "/api/admin/customers/:id/recalculate",
            post(customers::recalculate_customer),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/api/flowers", get(catalog::list_flowers))
        .route("/api/packaging", get(catalog::list_packaging))
        .route("/api/sizes", get(catalog::list_sizes))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/bouquets", get(catalog::list_bouquets))
        .route("/api/bouquets/:id", get(catalog::get_bouquet))
        .route("/api/promos/validate", post(promos::validate_promo))
        .route("/api/orders", post(orders::create_order_handler))
        .route("/api/orders/my", get(orders::get_order_history_handler))
        .route("/api/orders/:order_id", get(orders::get_order_by_id_handler))
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
