//! # Order Status
//!
//! The order lifecycle state machine. Statuses are stored as snake_case
//! text in the database; every status change goes through the transition
//! table instead of direct field assignment.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::StoreError;

/// Lifecycle status of an order.
///
/// ```text
///                ┌────────────────┐
///   Pending ────►│   Completed    │ (terminal)
///      │         └────────────────┘
///      │                ▲  ▲
///      ▼                │  │
///   PaymentFailed ──────┘  │
///      │                   │
///      ▼                   │
///   Cancelled (terminal)   │
///                          │
///   PaymentConfirmedButFailed (fulfillment error after capture)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, awaiting payment
    Pending,
    /// Paid and fulfilled (stock decremented, cart cleared)
    Completed,
    /// Gateway declined or the payment flow errored
    PaymentFailed,
    /// Gateway confirmed payment but local fulfillment failed
    PaymentConfirmedButFailed,
    /// Cancelled by the customer or an operator
    Cancelled,
}

impl OrderStatus {
    /// The snake_case form stored in the `orders.status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::PaymentConfirmedButFailed => "payment_confirmed_but_failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this status permits no further transitions.
    ///
    /// Webhook callbacks for terminal orders are acknowledged and skipped,
    /// which makes replayed callbacks idempotent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// The transition table.
    ///
    /// `PaymentFailed -> Completed` is allowed: the synchronous flow may
    /// have errored while the provider's asynchronous callback still
    /// confirms the charge.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Completed)
                | (Pending, PaymentFailed)
                | (Pending, PaymentConfirmedButFailed)
                | (Pending, Cancelled)
                | (PaymentFailed, Completed)
                | (PaymentFailed, Cancelled)
                | (PaymentConfirmedButFailed, Completed)
        )
    }

    /// Validate a transition, producing the typed error used by the store
    pub fn transition(&self, to: OrderStatus) -> Result<OrderStatus, StoreError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(StoreError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "payment_failed" => Ok(OrderStatus::PaymentFailed),
            "payment_confirmed_but_failed" => Ok(OrderStatus::PaymentConfirmedButFailed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StoreError::Internal(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::PaymentFailed,
            OrderStatus::PaymentConfirmedButFailed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_pending_transitions() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::PaymentFailed));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::PaymentFailed.is_terminal());

        assert!(!OrderStatus::Completed.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition(OrderStatus::Completed));
    }

    #[test]
    fn test_late_webhook_confirmation() {
        // The callback may arrive after the synchronous flow already failed
        assert!(OrderStatus::PaymentFailed.can_transition(OrderStatus::Completed));
        assert!(OrderStatus::PaymentConfirmedButFailed.can_transition(OrderStatus::Completed));
    }

    #[test]
    fn test_transition_error() {
        let err = OrderStatus::Completed
            .transition(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }
}
