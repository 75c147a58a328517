use crate::orders::OrderStatus;

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - New → Confirmed
    /// - Confirmed → InProgress
    /// - InProgress → Delivering
    /// - Delivering → Delivered
    /// - Any non-final status → Cancelled
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        if from == to {
            return true;
        }

        match (from, to) {
            (OrderStatus::New, OrderStatus::Confirmed) => true,
            (OrderStatus::Confirmed, OrderStatus::InProgress) => true,
            (OrderStatus::InProgress, OrderStatus::Delivering) => true,
            (OrderStatus::Delivering, OrderStatus::Delivered) => true,
            (from, OrderStatus::Cancelled) => !from.is_final(),
            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}
