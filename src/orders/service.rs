use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::loyalty::discount_rate_for;
use crate::orders::{
    CheckoutPlan, CreateOrderRequest, DiscountBreakdown, NewOrderItem, Order, OrderError,
    OrderFilter, OrderItemType, OrderResponse, OrderStatus, OrderSummary, PriceCalculator,
    StatusMachine, UpdateDeliveryRequest,
};
use crate::pricing::round_money;
use crate::promos::{
    Promo, PromoCheck, PromoError, PromoEvaluation, PromoRedemption, PromoRejection, PromoService,
    PromoViolation,
};
use crate::store::{CatalogLookup, CheckoutCommit, CustomerStore, OrderStore};
use crate::validation::MAX_MONEY_AMOUNT;

/// Promo accepted for an order, with the discount it grants before clamping
struct AppliedPromo {
    promo: Promo,
    discount: Decimal,
}

/// Service for checkout and order management
#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogLookup>,
    customers: Arc<dyn CustomerStore>,
    promos: PromoService,
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        customers: Arc<dyn CustomerStore>,
        promos: PromoService,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            catalog,
            customers,
            promos,
            orders,
        }
    }

    /// Places an order.
    ///
    /// The loyalty discount is taken from the customer's aggregates before
    /// this order. A promo that does not apply never blocks checkout: the
    /// order goes through at full price and the summary carries the
    /// rejection. The order, its items, the promo redemption and the
    /// customer aggregate update are committed together or not at all.
    ///
    /// # Arguments
    /// * `request` - Customer, delivery and line items as sent by the storefront
    /// * `user_id` - Authenticated customer, `None` for guest checkout
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        user_id: Option<i64>,
    ) -> Result<OrderSummary, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        request.validate()?;

        let customer = match user_id {
            Some(id) => Some(
                self.customers
                    .find_customer(id)
                    .await?
                    .ok_or(OrderError::CustomerNotFound(id))?,
            ),
            None => None,
        };

        let items = self.snapshot_items(&request).await?;
        let subtotal = items
            .iter()
            .map(|item| PriceCalculator::calculate_subtotal(item.quantity, item.price_snapshot))
            .collect::<Option<Vec<Decimal>>>()
            .and_then(|lines| PriceCalculator::order_subtotal(&lines, request.delivery_price))
            .filter(|subtotal| *subtotal <= MAX_MONEY_AMOUNT)
            .ok_or_else(|| {
                OrderError::ValidationError(format!("Order subtotal exceeds {}", MAX_MONEY_AMOUNT))
            })?;

        let customer_status = customer.as_ref().map(|c| c.aggregates().status());
        let status_rate = customer_status.map(discount_rate_for).unwrap_or(Decimal::ZERO);

        let (applied, mut promo_rejection) = match request.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => self.apply_promo(code, subtotal, user_id).await?,
            _ => (None, None),
        };

        let order_id = Uuid::new_v4();
        let plan = |promo: Option<&AppliedPromo>| {
            let totals = PriceCalculator::totals(
                subtotal,
                status_rate,
                promo.map_or(Decimal::ZERO, |p| p.discount),
            );
            CheckoutPlan {
                order_id,
                user_id,
                customer: request.customer.clone(),
                delivery: request.delivery.clone(),
                items: items.clone(),
                subtotal: totals.subtotal,
                delivery_price: round_money(request.delivery_price),
                status_discount: totals.status_discount,
                promo_discount: totals.promo_discount,
                promo_code: promo.map(|p| p.promo.code.clone()),
                total_amount: totals.total_amount,
                promo_claim: promo.map(|p| PromoRedemption {
                    promo_id: p.promo.id,
                    order_id,
                    user_id,
                    discount_amount: totals.promo_discount,
                }),
            }
        };

        let (order, order_items) = match self.orders.commit_checkout(&plan(applied.as_ref())).await? {
            CheckoutCommit::Committed { order, items } => (order, items),
            CheckoutCommit::PromoClaimRejected(violation) => {
                let code = applied.map(|p| p.promo.code).unwrap_or_default();
                warn!(
                    "Promo {} could not be claimed for order {} ({}), retrying without it",
                    code, order_id, violation
                );
                promo_rejection = Some(PromoRejection {
                    code,
                    reasons: vec![violation.to_string()],
                });

                match self.orders.commit_checkout(&plan(None)).await? {
                    CheckoutCommit::Committed { order, items } => (order, items),
                    CheckoutCommit::PromoClaimRejected(violation) => {
                        return Err(OrderError::Conflict(violation.to_string()))
                    }
                }
            }
        };

        info!(
            "Created order {} ({}) total {} for {}",
            order.order_number,
            order.id,
            order.total_amount,
            user_id.map_or_else(|| "guest".to_string(), |id| format!("customer {}", id))
        );

        let breakdown = DiscountBreakdown {
            subtotal: order.subtotal,
            customer_status,
            status_discount_rate: status_rate,
            status_discount: order.status_discount,
            promo_code: order.promo_code.clone(),
            promo_discount: order.promo_discount,
            total_amount: order.total_amount,
        };

        Ok(OrderSummary {
            order: OrderResponse {
                order,
                items: order_items,
            },
            breakdown,
            promo_rejection,
        })
    }

    /// Resolves each line's SKU to a catalog row; unknown SKUs are kept as
    /// `UNRESOLVED` with item id 0
    async fn snapshot_items(&self, request: &CreateOrderRequest) -> Result<Vec<NewOrderItem>, OrderError> {
        let skus: Vec<String> = request.items.iter().map(|line| line.sku.trim().to_string()).collect();
        let resolved = self.catalog.resolve_skus(&skus).await?;

        Ok(request
            .items
            .iter()
            .zip(skus)
            .map(|(line, sku)| {
                let (item_type, item_id) = match resolved.get(&sku) {
                    Some(item) => (item.item_type, item.item_id),
                    None => {
                        warn!("Unknown SKU {} ordered, storing as unresolved", sku);
                        (OrderItemType::Unresolved, 0)
                    }
                };
                NewOrderItem {
                    sku,
                    item_type,
                    item_id,
                    product_name_snapshot: line.name.trim().to_string(),
                    price_snapshot: round_money(line.price),
                    quantity: line.quantity,
                }
            })
            .collect())
    }

    /// Checks a promo against the order subtotal. Only storage failures are
    /// errors; everything else becomes a rejection.
    async fn apply_promo(
        &self,
        code: &str,
        subtotal: Decimal,
        user_id: Option<i64>,
    ) -> Result<(Option<AppliedPromo>, Option<PromoRejection>), OrderError> {
        match self.promos.check(code, subtotal, user_id).await {
            Ok(PromoCheck {
                promo,
                evaluation: PromoEvaluation::Valid { discount },
            }) => Ok((Some(AppliedPromo { promo, discount }), None)),
            Ok(PromoCheck { promo, evaluation }) => Ok((
                None,
                Some(PromoRejection {
                    code: promo.code,
                    reasons: evaluation.reasons(),
                }),
            )),
            Err(PromoError::CodeNotFound(code)) => Ok((
                None,
                Some(PromoRejection {
                    code,
                    reasons: vec![PromoViolation::NotFound.to_string()],
                }),
            )),
            Err(PromoError::Store(err)) => Err(err.into()),
            Err(other) => Err(OrderError::ValidationError(other.to_string())),
        }
    }

    async fn with_items(&self, order: Order) -> Result<OrderResponse, OrderError> {
        let items = self.orders.order_items(order.id).await?;
        Ok(OrderResponse { order, items })
    }

    async fn find(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Order history of one customer, newest first
    pub async fn list_my_orders(
        &self,
        user_id: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self
            .orders
            .list_orders(&OrderFilter {
                user_id: Some(user_id),
                status,
            })
            .await?;
        debug!("Customer {} has {} orders", user_id, orders.len());

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.with_items(order).await?);
        }
        Ok(responses)
    }

    /// Single order; visible to its owner and to admins
    pub async fn get_order(
        &self,
        order_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<OrderResponse, OrderError> {
        let order = self.find(order_id).await?;

        if !user.is_admin() && order.user_id != Some(user.user_id) {
            warn!("User {} tried to read order {}", user.user_id, order_id);
            return Err(OrderError::Forbidden(
                "You do not have permission to view this order".to_string(),
            ));
        }

        self.with_items(order).await
    }

    /// Admin listing, newest first
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .list_orders(&OrderFilter {
                user_id: None,
                status,
            })
            .await?)
    }

    /// Moves an order through its lifecycle.
    ///
    /// The write only applies if the order is still in the status it was
    /// read in, so two admins racing on one order cannot both win.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, OrderError> {
        let order = self.find(order_id).await?;
        let from = order.status;
        StatusMachine::transition(from, new_status).map_err(OrderError::InvalidTransition)?;

        if from == new_status {
            return self.with_items(order).await;
        }

        let updated = self
            .orders
            .update_status(order_id, from, new_status)
            .await?
            .ok_or_else(|| {
                OrderError::Conflict(format!("Order {} is no longer {}", order.order_number, from))
            })?;

        info!(
            "Order {} status changed from {} to {}",
            updated.order_number, from, new_status
        );
        self.with_items(updated).await
    }

    /// Edits delivery details; orders that are delivered or cancelled are frozen
    pub async fn update_delivery(
        &self,
        order_id: Uuid,
        request: UpdateDeliveryRequest,
    ) -> Result<OrderResponse, OrderError> {
        if request.is_empty() {
            return Err(OrderError::ValidationError(
                "At least one delivery field must be provided".to_string(),
            ));
        }
        request.validate()?;

        let order = self.find(order_id).await?;
        if order.status.is_final() {
            return Err(OrderError::ValidationError(format!(
                "Delivery details of a {} order cannot change",
                order.status
            )));
        }

        let updated = self
            .orders
            .update_delivery(order_id, &request)
            .await?
            .ok_or(OrderError::NotFound)?;
        info!("Updated delivery details of order {}", updated.order_number);
        self.with_items(updated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::loyalty::CustomerStatus;
    use crate::orders::{CustomerInfo, DeliveryInfo, LineItemRequest, OrderItem};
    use crate::promos::{CreatePromoRequest, DiscountType, PromoType};
    use crate::store::{MemoryStore, PromoStore, StoreError};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        promos: PromoService,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.add_flower(1, "FLW-000001", dec!(1.50));
        store.add_packaging(2, "PKG-000002", dec!(0.80));
        store.add_bouquet(4, "BQT-000004");
        // Two earlier orders: REGULAR, 5%
        store.add_customer(10, "ivana@example.com", 2, dec!(60));

        let promos = PromoService::new(store.clone());
        let service = OrderService::new(store.clone(), store.clone(), promos.clone(), store.clone());
        Fixture {
            store,
            promos,
            service,
        }
    }

    fn line(sku: &str, price: Decimal, quantity: i32) -> LineItemRequest {
        LineItemRequest {
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            price,
            quantity,
        }
    }

    /// 45.00 of bouquets plus 5.00 delivery: a 50.00 subtotal
    fn request(promo_code: Option<&str>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: CustomerInfo {
                name: "Ивана Петрова".to_string(),
                phone: "+359888123456".to_string(),
                email: Some("ivana@example.com".to_string()),
            },
            delivery: DeliveryInfo {
                address: Some("ул. Шипка 12, София".to_string()),
                ..Default::default()
            },
            items: vec![line("BQT-000004", dec!(45.00), 1)],
            delivery_price: dec!(5.00),
            promo_code: promo_code.map(str::to_string),
        }
    }

    async fn create_promo(promos: &PromoService, code: &str, discount_type: DiscountType, value: Decimal) -> Promo {
        promos
            .create(CreatePromoRequest {
                code: Some(code.to_string()),
                description: None,
                promo_type: PromoType::Permanent,
                discount_type,
                discount_value: value,
                min_order_amount: None,
                max_discount: None,
                valid_from: None,
                valid_to: None,
                max_uses: Some(1),
                max_uses_per_user: None,
                is_active: None,
            })
            .await
            .unwrap()
    }

    fn admin() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn test_regular_customer_gets_status_discount() {
        let f = fixture();
        let summary = f.service.create_order(request(None), Some(10)).await.unwrap();

        assert_eq!(summary.breakdown.subtotal, dec!(50.00));
        assert_eq!(summary.breakdown.customer_status, Some(CustomerStatus::Regular));
        assert_eq!(summary.breakdown.status_discount, dec!(2.50));
        assert_eq!(summary.breakdown.total_amount, dec!(47.50));
        assert_eq!(summary.order.order.order_number, "ORD-000001");
        assert_eq!(summary.order.order.status, OrderStatus::New);
        assert!(summary.promo_rejection.is_none());

        let customer = f.store.find_customer(10).await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 3);
        assert_eq!(customer.total_spent, dec!(107.50));
        assert_eq!(customer.customer_status, CustomerStatus::Regular);
        assert!(customer.last_order_date.is_some());
    }

    #[tokio::test]
    async fn test_guest_order_has_no_status_discount() {
        let f = fixture();
        let summary = f.service.create_order(request(None), None).await.unwrap();

        assert_eq!(summary.breakdown.customer_status, None);
        assert_eq!(summary.breakdown.status_discount, dec!(0));
        assert_eq!(summary.breakdown.total_amount, dec!(50.00));
        assert_eq!(summary.order.order.user_id, None);
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let f = fixture();
        let first = f.service.create_order(request(None), None).await.unwrap();
        let second = f.service.create_order(request(None), None).await.unwrap();

        assert_eq!(first.order.order.order_number, "ORD-000001");
        assert_eq!(second.order.order.order_number, "ORD-000002");
    }

    #[tokio::test]
    async fn test_valid_promo_is_redeemed() {
        let f = fixture();
        let promo = create_promo(&f.promos, "SPRING10", DiscountType::Fixed, dec!(10)).await;

        let summary = f
            .service
            .create_order(request(Some("spring10")), Some(10))
            .await
            .unwrap();

        assert_eq!(summary.breakdown.promo_code.as_deref(), Some("SPRING10"));
        assert_eq!(summary.breakdown.promo_discount, dec!(10.00));
        assert_eq!(summary.breakdown.total_amount, dec!(37.50));

        let stored = f.store.find_promo(promo.id).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        let usages = f.store.list_usages(promo.id).await.unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].order_id, summary.order.order.id);
        assert_eq!(usages[0].user_id, Some(10));
        assert_eq!(usages[0].discount_amount, dec!(10.00));
    }

    #[tokio::test]
    async fn test_ineligible_promo_still_completes_order() {
        let f = fixture();
        let promo = f
            .promos
            .create(CreatePromoRequest {
                code: Some("BIG100".to_string()),
                description: None,
                promo_type: PromoType::Permanent,
                discount_type: DiscountType::Percentage,
                discount_value: dec!(20),
                min_order_amount: Some(dec!(100)),
                max_discount: None,
                valid_from: None,
                valid_to: None,
                max_uses: None,
                max_uses_per_user: None,
                is_active: None,
            })
            .await
            .unwrap();

        let summary = f.service.create_order(request(Some("BIG100")), None).await.unwrap();

        assert_eq!(summary.breakdown.promo_discount, dec!(0));
        assert_eq!(summary.breakdown.promo_code, None);
        assert_eq!(summary.breakdown.total_amount, dec!(50.00));
        let rejection = summary.promo_rejection.unwrap();
        assert_eq!(rejection.code, "BIG100");
        assert_eq!(
            rejection.reasons,
            vec![PromoViolation::BelowMinimum { min: dec!(100) }.to_string()]
        );
        assert_eq!(f.store.usage_count(promo.id), 0);
    }

    #[tokio::test]
    async fn test_unknown_promo_is_soft_rejection() {
        let f = fixture();
        let summary = f.service.create_order(request(Some("ghost")), None).await.unwrap();

        let rejection = summary.promo_rejection.unwrap();
        assert_eq!(rejection.code, "GHOST");
        assert_eq!(rejection.reasons, vec![PromoViolation::NotFound.to_string()]);
        assert_eq!(f.store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_fixed_promo_cannot_push_total_below_zero() {
        let f = fixture();
        create_promo(&f.promos, "HUGE", DiscountType::Fixed, dec!(80)).await;

        let summary = f.service.create_order(request(Some("HUGE")), Some(10)).await.unwrap();

        assert_eq!(summary.breakdown.status_discount, dec!(2.50));
        assert_eq!(summary.breakdown.promo_discount, dec!(47.50));
        assert_eq!(summary.breakdown.total_amount, dec!(0.00));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let f = fixture();
        let promo = create_promo(&f.promos, "SPRING10", DiscountType::Fixed, dec!(10)).await;
        f.store.fail_commits(true);

        let result = f.service.create_order(request(Some("SPRING10")), Some(10)).await;
        assert!(matches!(result, Err(OrderError::Store(_))));

        assert_eq!(f.store.order_count(), 0);
        assert_eq!(f.store.usage_count(promo.id), 0);
        assert_eq!(f.store.find_promo(promo.id).await.unwrap().unwrap().used_count, 0);
        let customer = f.store.find_customer(10).await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent, dec!(60));
    }

    #[tokio::test]
    async fn test_empty_order_rejected_without_side_effects() {
        let f = fixture();
        let mut empty = request(None);
        empty.items.clear();

        let result = f.service.create_order(empty, Some(10)).await;
        assert!(matches!(result, Err(OrderError::ValidationError(_))));
        assert_eq!(f.store.order_count(), 0);
        assert_eq!(f.store.find_customer(10).await.unwrap().unwrap().total_orders, 2);
    }

    #[tokio::test]
    async fn test_invalid_lines_rejected() {
        let f = fixture();
        let mut zero_quantity = request(None);
        zero_quantity.items = vec![line("FLW-000001", dec!(1.50), 0)];
        assert!(matches!(
            f.service.create_order(zero_quantity, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        let mut negative_price = request(None);
        negative_price.items = vec![line("FLW-000001", dec!(-1), 1)];
        assert!(matches!(
            f.service.create_order(negative_price, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        let mut no_phone = request(None);
        no_phone.customer.phone = "  ".to_string();
        assert!(matches!(
            f.service.create_order(no_phone, None).await,
            Err(OrderError::InvalidRequest(_))
        ));
        assert_eq!(f.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_skus_resolved_and_unknown_kept() {
        let f = fixture();
        let mut mixed = request(None);
        mixed.items = vec![
            line("FLW-000001", dec!(1.50), 10),
            line("PKG-000002", dec!(0.80), 1),
            line("NOPE-1", dec!(3.00), 2),
        ];
        mixed.delivery_price = dec!(0);

        let summary = f.service.create_order(mixed, None).await.unwrap();
        let items: &[OrderItem] = &summary.order.items;

        assert_eq!(items.len(), 3);
        assert_eq!((items[0].item_type, items[0].item_id), (OrderItemType::Flower, 1));
        assert_eq!((items[1].item_type, items[1].item_id), (OrderItemType::Packaging, 2));
        assert_eq!((items[2].item_type, items[2].item_id), (OrderItemType::Unresolved, 0));
        assert_eq!(items[2].price_snapshot, dec!(3.00));
        assert_eq!(summary.breakdown.subtotal, dec!(21.80));
    }

    #[tokio::test]
    async fn test_missing_customer_rejected() {
        let f = fixture();
        let result = f.service.create_order(request(None), Some(404)).await;
        assert!(matches!(result, Err(OrderError::CustomerNotFound(404))));
    }

    /// Order store that lets another checkout use up the promo between the
    /// eligibility check and the commit
    struct RacingStore {
        inner: Arc<MemoryStore>,
        promo_id: i64,
    }

    #[async_trait]
    impl OrderStore for RacingStore {
        async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<CheckoutCommit, StoreError> {
            if plan.promo_claim.is_some() {
                self.inner.set_used_count(self.promo_id, 1);
            }
            self.inner.commit_checkout(plan).await
        }

        async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
            self.inner.find_order(id).await
        }

        async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
            self.inner.order_items(order_id).await
        }

        async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
            self.inner.list_orders(filter).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            from: OrderStatus,
            to: OrderStatus,
        ) -> Result<Option<Order>, StoreError> {
            self.inner.update_status(id, from, to).await
        }

        async fn update_delivery(
            &self,
            id: Uuid,
            delivery: &UpdateDeliveryRequest,
        ) -> Result<Option<Order>, StoreError> {
            self.inner.update_delivery(id, delivery).await
        }
    }

    #[tokio::test]
    async fn test_promo_exhausted_at_commit_retries_without_promo() {
        let f = fixture();
        let promo = create_promo(&f.promos, "LAST1", DiscountType::Fixed, dec!(10)).await;
        let racing = Arc::new(RacingStore {
            inner: f.store.clone(),
            promo_id: promo.id,
        });
        let service = OrderService::new(f.store.clone(), f.store.clone(), f.promos.clone(), racing);

        let summary = service.create_order(request(Some("LAST1")), Some(10)).await.unwrap();

        assert_eq!(summary.breakdown.promo_discount, dec!(0));
        assert_eq!(summary.breakdown.promo_code, None);
        assert_eq!(summary.breakdown.total_amount, dec!(47.50));
        let rejection = summary.promo_rejection.unwrap();
        assert_eq!(rejection.code, "LAST1");
        assert_eq!(rejection.reasons, vec![PromoViolation::Exhausted.to_string()]);

        assert_eq!(f.store.order_count(), 1);
        assert_eq!(f.store.usage_count(promo.id), 0);
        assert_eq!(f.store.find_customer(10).await.unwrap().unwrap().total_orders, 3);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = fixture();
        let summary = f.service.create_order(request(None), Some(10)).await.unwrap();
        let id = summary.order.order.id;

        let confirmed = f.service.update_status(id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.order.status, OrderStatus::Confirmed);

        let skipped = f.service.update_status(id, OrderStatus::Delivered).await;
        assert!(matches!(skipped, Err(OrderError::InvalidTransition(_))));

        let cancelled = f.service.update_status(id, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

        let reopened = f.service.update_status(id, OrderStatus::New).await;
        assert!(matches!(reopened, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.update_status(Uuid::new_v4(), OrderStatus::Confirmed).await,
            Err(OrderError::NotFound)
        ));
        assert!(matches!(
            f.service.get_order(Uuid::new_v4(), &admin()).await,
            Err(OrderError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_order_visible_to_owner_and_admin_only() {
        let f = fixture();
        let summary = f.service.create_order(request(None), Some(10)).await.unwrap();
        let id = summary.order.order.id;

        let owner = AuthenticatedUser {
            user_id: 10,
            email: "ivana@example.com".to_string(),
            role: Role::Customer,
        };
        let stranger = AuthenticatedUser {
            user_id: 11,
            email: "other@example.com".to_string(),
            role: Role::Customer,
        };

        assert_eq!(f.service.get_order(id, &owner).await.unwrap().items.len(), 1);
        assert!(f.service.get_order(id, &admin()).await.is_ok());
        assert!(matches!(
            f.service.get_order(id, &stranger).await,
            Err(OrderError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_history_lists_only_own_orders() {
        let f = fixture();
        f.service.create_order(request(None), Some(10)).await.unwrap();
        f.service.create_order(request(None), None).await.unwrap();

        let mine = f.service.list_my_orders(10, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].items.len(), 1);
        assert_eq!(f.service.list_orders(None).await.unwrap().len(), 2);
        assert!(f
            .service
            .list_orders(Some(OrderStatus::Delivered))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_delivery_keeps_omitted_fields() {
        let f = fixture();
        let summary = f.service.create_order(request(None), None).await.unwrap();
        let id = summary.order.order.id;

        let updated = f
            .service
            .update_delivery(
                id,
                UpdateDeliveryRequest {
                    recipient_name: Some("Мария".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.order.recipient_name.as_deref(), Some("Мария"));
        assert_eq!(updated.order.delivery_address.as_deref(), Some("ул. Шипка 12, София"));

        assert!(matches!(
            f.service.update_delivery(id, UpdateDeliveryRequest::default()).await,
            Err(OrderError::ValidationError(_))
        ));

        let long_slot = UpdateDeliveryRequest {
            delivery_time_slot: Some("9".repeat(33)),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update_delivery(id, long_slot).await,
            Err(OrderError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_amounts_beyond_money_range_rejected() {
        let f = fixture();

        let mut huge_price = request(None);
        huge_price.items = vec![line("FLW-000001", dec!(50000000000000000000), 2_000_000_000)];
        assert!(matches!(
            f.service.create_order(huge_price, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        // Each line is storable, their sum is not
        let mut huge_total = request(None);
        huge_total.items = vec![line("FLW-000001", dec!(9999999999.99), 10_000)];
        assert!(matches!(
            f.service.create_order(huge_total, None).await,
            Err(OrderError::ValidationError(_))
        ));

        let mut two_lines = request(None);
        two_lines.items = vec![
            line("FLW-000001", dec!(9999999999.99), 1),
            line("PKG-000002", dec!(9999999999.99), 1),
        ];
        assert!(matches!(
            f.service.create_order(two_lines, Some(10)).await,
            Err(OrderError::ValidationError(_))
        ));

        assert_eq!(f.store.order_count(), 0);
        assert_eq!(f.store.find_customer(10).await.unwrap().unwrap().total_orders, 2);
    }

    #[tokio::test]
    async fn test_fields_longer_than_columns_rejected() {
        let f = fixture();

        let mut long_sku = request(None);
        long_sku.items = vec![line(&"X".repeat(33), dec!(1.50), 1)];
        assert!(matches!(
            f.service.create_order(long_sku, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        let mut long_phone = request(None);
        long_phone.customer.phone = "8".repeat(33);
        assert!(matches!(
            f.service.create_order(long_phone, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        let mut long_recipient_phone = request(None);
        long_recipient_phone.delivery.recipient_phone = Some("8".repeat(33));
        assert!(matches!(
            f.service.create_order(long_recipient_phone, None).await,
            Err(OrderError::InvalidRequest(_))
        ));

        // 32 characters still fits and an unknown SKU is stored unresolved
        let mut unknown_sku = request(None);
        unknown_sku.items = vec![line(&"Я".repeat(32), dec!(1.50), 1)];
        let summary = f.service.create_order(unknown_sku, None).await.unwrap();
        assert_eq!(summary.order.items[0].item_type, OrderItemType::Unresolved);
        assert_eq!(f.store.order_count(), 1);
    }
}
