//! Tiered refunds for customer cancellations of paid orders.
//!
//! Scheduled orders (with a pickup time) are judged by how much notice the kitchen gets. Immediate orders are judged
//! by how long ago they were placed.
//!
//! | Order type | Window                      | Refund |
//! |------------|-----------------------------|--------|
//! | Scheduled  | pickup 30 min or more away  | 100%   |
//! | Scheduled  | pickup less than 30 min away| 90%    |
//! | Immediate  | placed up to 10 min ago     | 100%   |
//! | Immediate  | placed up to 15 min ago     | 90%    |
//! | Immediate  | placed up to 20 min ago     | 20%    |
//! | Immediate  | placed more than 20 min ago | refused |
use chrono::{DateTime, Duration, Utc};

use crate::db_types::{Money, Order};

pub const SCHEDULED_NOTICE: Duration = Duration::minutes(30);
pub const SCHEDULED_SHORT_NOTICE_PERCENT: u8 = 90;

/// The tiers for immediate orders: (maximum elapsed time, refund percentage).
pub const IMMEDIATE_TIERS: [(Duration, u8); 3] =
    [(Duration::minutes(10), 100), (Duration::minutes(15), 90), (Duration::minutes(20), 20)];

/// Returns the percentage of the order total to refund if the customer cancels at `now`, or `None` if it is too late
/// to cancel.
pub fn refund_percentage(order_date: DateTime<Utc>, pickup_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<u8> {
    match pickup_time {
        Some(pickup) => {
            let remaining = pickup - now;
            if remaining < SCHEDULED_NOTICE {
                Some(SCHEDULED_SHORT_NOTICE_PERCENT)
            } else {
                Some(100)
            }
        },
        None => {
            let elapsed = now - order_date;
            IMMEDIATE_TIERS.iter().find(|(limit, _)| elapsed <= *limit).map(|(_, percent)| *percent)
        },
    }
}

/// A refund decision for a specific order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundQuote {
    pub percentage: u8,
    pub amount: Money,
}

/// Applies the policy to a paid order. The amount is rounded down to the nearest minor unit.
pub fn quote_refund(order: &Order, now: DateTime<Utc>) -> Option<RefundQuote> {
    refund_percentage(order.order_date, order.pickup_time, now)
        .map(|percentage| RefundQuote { percentage, amount: order.total_price.percentage(percentage) })
}
