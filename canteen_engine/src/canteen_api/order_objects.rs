use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderId, OrderLine, OrderStatusType, UserId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub user_id: Option<UserId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_statuses(self, statuses: &[OrderStatusType]) -> Self {
        statuses.iter().fold(self, |filter, status| filter.with_status(*status))
    }

    pub fn sorted(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// True if the filter places no restriction on which orders are returned. Sorting does not count.
    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.user_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.as_ref().map_or(true, |s| s.is_empty())
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters. {:?}", self.sort);
        }
        if let Some(order_id) = self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(user_id) = self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until: {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let list = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: [{list}]. ")?;
        }
        write!(f, "{:?}", self.sort)
    }
}

/// A customer's request for a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLine>,
    /// When set, the order is a scheduled order, to be collected at this time.
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
}

impl PlaceOrderRequest {
    pub fn new(items: Vec<OrderLine>) -> Self {
        Self { items, pickup_time: None }
    }

    pub fn with_pickup_time(mut self, pickup_time: DateTime<Utc>) -> Self {
        self.pickup_time = Some(pickup_time);
        self
    }
}

/// Replacement line items for an unpaid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationResult {
    pub order: Order,
    /// The amount returned to the customer's wallet.
    pub refund: Money,
    /// The share of the total that was refunded. `None` if the order had not been paid for.
    pub refund_percentage: Option<u8>,
}
