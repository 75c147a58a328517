use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::auth::Role;
use crate::loyalty::{CustomerAggregates, CustomerStatus};

/// Customer account with loyalty aggregates
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub total_orders: i32,
    pub total_spent: Decimal,
    pub customer_status: CustomerStatus,
    pub last_order_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn aggregates(&self) -> CustomerAggregates {
        CustomerAggregates {
            total_orders: self.total_orders,
            total_spent: self.total_spent,
            last_order_date: self.last_order_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CustomerListQuery {
    pub status: Option<CustomerStatus>,
}
