use std::sync::Arc;
use tracing::info;

use crate::customers::models::Customer;
use crate::error::ApiError;
use crate::loyalty::CustomerStatus;
use crate::store::CustomerStore;

/// Admin-side customer queries and aggregate correction
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, status: Option<CustomerStatus>) -> Result<Vec<Customer>, ApiError> {
        Ok(self.store.list_customers(status).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Customer, ApiError> {
        self.store
            .find_customer(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Customer", id))
    }

    /// Rebuilds the aggregates from the customer's non-cancelled orders.
    /// The tier may go down.
    pub async fn recalculate(&self, id: i64) -> Result<Customer, ApiError> {
        let before = self.get(id).await?;
        let after = self
            .store
            .recalculate_aggregates(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Customer", id))?;

        info!(
            "Recalculated customer {}: {} orders / {} spent ({} -> {})",
            id, after.total_orders, after.total_spent, before.customer_status, after.customer_status
        );
        Ok(after)
    }
}
