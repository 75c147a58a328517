// In-memory storage backend
//
// Implements every storage trait over a single mutex-guarded state. Checkout
// stages its writes on a copy of the state and swaps it in at the end, so an
// injected failure leaves nothing behind.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::auth::Role;
use crate::customers::models::Customer;
use crate::db::format_sequence;
use crate::loyalty::{classify, CustomerStatus};
use crate::orders::models::{
    CheckoutPlan, Order, OrderFilter, OrderItem, OrderItemType, OrderStatus, UpdateDeliveryRequest,
};
use crate::pricing::CatalogPrices;
use crate::promos::engine::PromoViolation;
use crate::promos::models::{Promo, PromoDraft, PromoRedemption, PromoUsage};
use crate::store::{
    CatalogLookup, CheckoutCommit, CustomerStore, OrderStore, PromoStore, RedeemOutcome,
    ResolvedItem, StoreError,
};

#[derive(Debug, Clone, Default)]
struct State {
    flower_prices: HashMap<i64, Decimal>,
    packaging_prices: HashMap<i64, Decimal>,
    skus: HashMap<String, ResolvedItem>,
    customers: HashMap<i64, Customer>,
    promos: HashMap<i64, Promo>,
    usages: Vec<PromoUsage>,
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
    last_id: i64,
    last_order_number: i64,
    fail_commits: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user_usages(&self, promo_id: i64, user_id: i64) -> i64 {
        self.usages
            .iter()
            .filter(|u| u.promo_id == promo_id && u.user_id == Some(user_id))
            .count() as i64
    }

    /// Same guards as the conditional UPDATE used by PostgreSQL
    fn claim(&mut self, redemption: &PromoRedemption) -> Result<(), PromoViolation> {
        let prior = redemption
            .user_id
            .map(|user_id| self.user_usages(redemption.promo_id, user_id));

        let promo = self
            .promos
            .get_mut(&redemption.promo_id)
            .ok_or(PromoViolation::NotFound)?;

        if !promo.is_active {
            return Err(PromoViolation::Inactive);
        }
        if matches!(promo.max_uses, Some(max) if promo.used_count >= max) {
            return Err(PromoViolation::Exhausted);
        }
        if matches!(prior, Some(used) if used >= i64::from(promo.max_uses_per_user)) {
            return Err(PromoViolation::PerUserLimitReached);
        }

        promo.used_count += 1;
        promo.updated_at = Utc::now();

        let id = self.next_id();
        self.usages.push(PromoUsage {
            id,
            promo_id: redemption.promo_id,
            order_id: redemption.order_id,
            user_id: redemption.user_id,
            discount_amount: redemption.discount_amount,
            used_at: Utc::now(),
        });
        Ok(())
    }
}

/// Mutex-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_flower(&self, id: i64, sku: &str, price: Decimal) {
        let mut state = self.lock();
        state.flower_prices.insert(id, price);
        state.skus.insert(
            sku.to_string(),
            ResolvedItem { item_type: OrderItemType::Flower, item_id: id },
        );
    }

    pub fn add_packaging(&self, id: i64, sku: &str, price_per_unit: Decimal) {
        let mut state = self.lock();
        state.packaging_prices.insert(id, price_per_unit);
        state.skus.insert(
            sku.to_string(),
            ResolvedItem { item_type: OrderItemType::Packaging, item_id: id },
        );
    }

    pub fn add_bouquet(&self, id: i64, sku: &str) {
        self.lock().skus.insert(
            sku.to_string(),
            ResolvedItem { item_type: OrderItemType::Bouquet, item_id: id },
        );
    }

    /// Seeds a customer with existing aggregates
    pub fn add_customer(&self, id: i64, email: &str, total_orders: i32, total_spent: Decimal) -> Customer {
        let customer = Customer {
            id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or_default().to_string(),
            phone: None,
            role: Role::Customer,
            total_orders,
            total_spent,
            customer_status: classify(total_orders, total_spent),
            last_order_date: None,
            created_at: Utc::now(),
        };
        self.lock().customers.insert(id, customer.clone());
        customer
    }

    /// Overrides a promo's usage counter
    pub fn set_used_count(&self, promo_id: i64, used_count: i32) {
        if let Some(promo) = self.lock().promos.get_mut(&promo_id) {
            promo.used_count = used_count;
        }
    }

    /// Makes every following checkout fail after staging its writes
    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commits = fail;
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn usage_count(&self, promo_id: i64) -> usize {
        self.lock().usages.iter().filter(|u| u.promo_id == promo_id).count()
    }
}

#[async_trait]
impl CatalogPrices for MemoryStore {
    async fn flower_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.flower_prices.get(id).map(|price| (*id, *price)))
            .collect())
    }

    async fn packaging_prices(&self, ids: &[i64]) -> Result<HashMap<i64, Decimal>, StoreError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.packaging_prices.get(id).map(|price| (*id, *price)))
            .collect())
    }
}

#[async_trait]
impl CatalogLookup for MemoryStore {
    async fn resolve_skus(&self, skus: &[String]) -> Result<HashMap<String, ResolvedItem>, StoreError> {
        let state = self.lock();
        Ok(skus
            .iter()
            .filter_map(|sku| state.skus.get(sku).map(|item| (sku.clone(), *item)))
            .collect())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        Ok(self.lock().customers.get(&id).cloned())
    }

    async fn list_customers(&self, status: Option<CustomerStatus>) -> Result<Vec<Customer>, StoreError> {
        let state = self.lock();
        let mut customers: Vec<Customer> = state
            .customers
            .values()
            .filter(|c| status.map_or(true, |s| c.customer_status == s))
            .cloned()
            .collect();
        customers.sort_by_key(|c| c.id);
        Ok(customers)
    }

    async fn recalculate_aggregates(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let mut state = self.lock();
        let counted: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == Some(id) && o.status != OrderStatus::Cancelled)
            .collect();
        let total_orders = counted.len() as i32;
        let total_spent: Decimal = counted.iter().map(|o| o.total_amount).sum();
        let last_order_date = counted.iter().map(|o| o.created_at).max();

        let Some(customer) = state.customers.get_mut(&id) else {
            return Ok(None);
        };
        customer.total_orders = total_orders;
        customer.total_spent = total_spent;
        customer.last_order_date = last_order_date;
        customer.customer_status = classify(total_orders, total_spent);
        Ok(Some(customer.clone()))
    }
}

#[async_trait]
impl PromoStore for MemoryStore {
    async fn find_promo_by_code(&self, code: &str) -> Result<Option<Promo>, StoreError> {
        Ok(self.lock().promos.values().find(|p| p.code == code).cloned())
    }

    async fn find_promo(&self, id: i64) -> Result<Option<Promo>, StoreError> {
        Ok(self.lock().promos.get(&id).cloned())
    }

    async fn list_promos(&self, active: Option<bool>) -> Result<Vec<Promo>, StoreError> {
        let state = self.lock();
        let mut promos: Vec<Promo> = state
            .promos
            .values()
            .filter(|p| active.map_or(true, |a| p.is_active == a))
            .cloned()
            .collect();
        promos.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(promos)
    }

    async fn count_user_usages(&self, promo_id: i64, user_id: i64) -> Result<i64, StoreError> {
        Ok(self.lock().user_usages(promo_id, user_id))
    }

    async fn list_usages(&self, promo_id: i64) -> Result<Vec<PromoUsage>, StoreError> {
        let state = self.lock();
        let mut usages: Vec<PromoUsage> = state
            .usages
            .iter()
            .filter(|u| u.promo_id == promo_id)
            .cloned()
            .collect();
        usages.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(usages)
    }

    async fn insert_promo(&self, draft: &PromoDraft) -> Result<Promo, StoreError> {
        let mut state = self.lock();
        if state.promos.values().any(|p| p.code == draft.code) {
            return Err(StoreError::Conflict(format!("promo code {}", draft.code)));
        }

        let now = Utc::now();
        let promo = Promo {
            id: state.next_id(),
            code: draft.code.clone(),
            description: draft.description.clone(),
            promo_type: draft.promo_type,
            discount_type: draft.discount_type,
            discount_value: draft.discount_value,
            min_order_amount: draft.min_order_amount,
            max_discount: draft.max_discount,
            valid_from: draft.valid_from,
            valid_to: draft.valid_to,
            max_uses: draft.max_uses,
            max_uses_per_user: draft.max_uses_per_user,
            used_count: 0,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        state.promos.insert(promo.id, promo.clone());
        Ok(promo)
    }

    async fn update_promo(&self, id: i64, draft: &PromoDraft) -> Result<Option<Promo>, StoreError> {
        let mut state = self.lock();
        let Some(promo) = state.promos.get_mut(&id) else {
            return Ok(None);
        };

        promo.description = draft.description.clone();
        promo.promo_type = draft.promo_type;
        promo.discount_type = draft.discount_type;
        promo.discount_value = draft.discount_value;
        promo.min_order_amount = draft.min_order_amount;
        promo.max_discount = draft.max_discount;
        promo.valid_from = draft.valid_from;
        promo.valid_to = draft.valid_to;
        promo.max_uses = draft.max_uses;
        promo.max_uses_per_user = draft.max_uses_per_user;
        promo.is_active = draft.is_active;
        promo.updated_at = Utc::now();
        Ok(Some(promo.clone()))
    }

    async fn redeem(&self, redemption: &PromoRedemption) -> Result<RedeemOutcome, StoreError> {
        match self.lock().claim(redemption) {
            Ok(()) => Ok(RedeemOutcome::Redeemed),
            Err(violation) => Ok(RedeemOutcome::Rejected(violation)),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<CheckoutCommit, StoreError> {
        let mut state = self.lock();
        let mut staged = state.clone();

        if let Some(claim) = &plan.promo_claim {
            if let Err(violation) = staged.claim(claim) {
                return Ok(CheckoutCommit::PromoClaimRejected(violation));
            }
        }

        staged.last_order_number += 1;
        let order_number = format_sequence("ORD", staged.last_order_number);
        let now = Utc::now();

        let order = Order {
            id: plan.order_id,
            order_number,
            user_id: plan.user_id,
            customer_name: plan.customer.name.clone(),
            customer_phone: plan.customer.phone.clone(),
            customer_email: plan.customer.email.clone(),
            delivery_address: plan.delivery.address.clone(),
            delivery_date: plan.delivery.date,
            delivery_time_slot: plan.delivery.time_slot.clone(),
            recipient_name: plan.delivery.recipient_name.clone(),
            recipient_phone: plan.delivery.recipient_phone.clone(),
            notes: plan.delivery.notes.clone(),
            status: OrderStatus::New,
            subtotal: plan.subtotal,
            delivery_price: plan.delivery_price,
            status_discount: plan.status_discount,
            promo_discount: plan.promo_discount,
            promo_code: plan.promo_code.clone(),
            total_amount: plan.total_amount,
            created_at: now,
            updated_at: now,
        };
        staged.orders.insert(order.id, order.clone());

        let mut items = Vec::with_capacity(plan.items.len());
        for item in &plan.items {
            let stored = OrderItem {
                id: staged.next_id(),
                order_id: order.id,
                sku: item.sku.clone(),
                item_type: item.item_type,
                item_id: item.item_id,
                product_name_snapshot: item.product_name_snapshot.clone(),
                price_snapshot: item.price_snapshot,
                quantity: item.quantity,
            };
            staged.items.push(stored.clone());
            items.push(stored);
        }

        if let Some(user_id) = plan.user_id {
            let customer = staged.customers.get_mut(&user_id).ok_or_else(|| {
                StoreError::Unavailable(format!("customer {} does not exist", user_id))
            })?;
            customer.total_orders += 1;
            customer.total_spent += plan.total_amount;
            customer.last_order_date = Some(now);
            customer.customer_status = classify(customer.total_orders, customer.total_spent);
        }

        if staged.fail_commits {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        *state = staged;
        Ok(CheckoutCommit::Committed { order, items })
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self
            .lock()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let state = self.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |id| o.user_id == Some(id)))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.lock();
        match state.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_delivery(
        &self,
        id: Uuid,
        delivery: &UpdateDeliveryRequest,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.lock();
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(address) = &delivery.delivery_address {
            order.delivery_address = Some(address.clone());
        }
        if let Some(date) = delivery.delivery_date {
            order.delivery_date = Some(date);
        }
        if let Some(slot) = &delivery.delivery_time_slot {
            order.delivery_time_slot = Some(slot.clone());
        }
        if let Some(name) = &delivery.recipient_name {
            order.recipient_name = Some(name.clone());
        }
        if let Some(phone) = &delivery.recipient_phone {
            order.recipient_phone = Some(phone.clone());
        }
        if let Some(notes) = &delivery.notes {
            order.notes = Some(notes.clone());
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}
