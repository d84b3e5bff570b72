use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{MenuItemId, OrderId, OrderStatusType, UserId};

/// The order-flow operations that depend on an order's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOperation {
    ConfirmPayment,
    Cancel,
    Reject,
    Progress,
    Update,
}

impl Display for OrderOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderOperation::ConfirmPayment => write!(f, "confirm payment for"),
            OrderOperation::Cancel => write!(f, "cancel"),
            OrderOperation::Reject => write!(f, "reject"),
            OrderOperation::Progress => write!(f, "progress"),
            OrderOperation::Update => write!(f, "update"),
        }
    }
}

/// Why a menu item could not be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockShortfall {
    NotFound,
    Insufficient { requested: i64, available: i64 },
}

impl Display for StockShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockShortfall::NotFound => write!(f, "the item does not exist"),
            StockShortfall::Insufficient { requested, available } => {
                write!(f, "{requested} requested, but only {available} in stock")
            },
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("User {user} may not act on order {order}")]
    Unauthorized { order: OrderId, user: UserId },
    #[error("Cannot {operation} order {order_id} from status {status}")]
    InvalidStatus { order_id: OrderId, status: OrderStatusType, operation: OrderOperation },
    #[error("It is too late to cancel order {0}")]
    TooLateToCancel(OrderId),
    #[error("Insufficient stock for menu item {item}: {reason}")]
    OutOfStock { item: MenuItemId, reason: StockShortfall },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Payment for order {order_id} failed: {reason}")]
    PaymentFailed { order_id: OrderId, reason: String },
    #[error("Refund for order {order_id} failed: {reason}")]
    RefundFailed { order_id: OrderId, reason: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("System error: {0}")]
    SystemError(String),
}

impl OrderFlowError {
    pub fn database<E: Display>(e: E) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum NotificationApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Wallet error: {0}")]
    WalletError(#[from] crate::wallet::WalletError),
}
