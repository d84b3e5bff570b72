use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderId, OrderStatusType, UserId};

/// A new order has been placed and its stock reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Staff have moved an order one step along the kitchen pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnulmentKind {
    /// Cancelled by the customer.
    Cancelled,
    /// Rejected by canteen staff.
    Rejected,
    /// Cancelled by the system because it was not paid in time.
    Expired,
}

/// An order has moved to `Cancelled`, for whatever reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub kind: AnnulmentKind,
    /// The amount returned to the customer's wallet. Zero for unpaid orders.
    pub refund: Money,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, kind: AnnulmentKind, refund: Money) -> Self {
        Self { order, kind, refund }
    }
}

/// A pending order had its line items replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifiedEvent {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderModifiedEvent {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }
}

/// A message for a user's notification inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: UserId,
    pub message: String,
    pub link: Option<String>,
}

impl NotificationEvent {
    pub fn new<S: Into<String>>(user_id: UserId, message: S, link: Option<String>) -> Self {
        Self { user_id, message: message.into(), link }
    }
}
