use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use canteen_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

id_type!(OrderId, "Identity of an order, assigned by the database when the order is placed.");
id_type!(UserId, "Identity of a user. Users are managed outside of the engine.");
id_type!(MenuItemId, "Identity of a menu item in the catalog.");

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed and its stock reserved, but it has not been paid for yet.
    PendingPayment,
    /// The wallet has been charged for the order.
    Paid,
    /// The kitchen is preparing the order.
    Preparing,
    /// The order is waiting at the counter.
    ReadyForPickup,
    /// The customer has collected the order.
    Completed,
    /// The order was cancelled by the customer, rejected by staff, or expired without payment.
    Cancelled,
}

impl OrderStatusType {
    /// The statuses that canteen staff work on.
    pub const PROCESSABLE: [OrderStatusType; 3] =
        [OrderStatusType::Paid, OrderStatusType::Preparing, OrderStatusType::ReadyForPickup];

    /// The single next status reachable through staff progression, if there is one.
    ///
    /// | From           | To             |
    /// |----------------|----------------|
    /// | Paid           | Preparing      |
    /// | Preparing      | ReadyForPickup |
    /// | ReadyForPickup | Completed      |
    pub fn next(&self) -> Option<OrderStatusType> {
        use OrderStatusType::*;
        match self {
            Paid => Some(Preparing),
            Preparing => Some(ReadyForPickup),
            ReadyForPickup => Some(Completed),
            PendingPayment | Completed | Cancelled => None,
        }
    }

    /// True if the order holds a stock reservation that must be released if the order is abandoned.
    pub fn holds_reservation(&self) -> bool {
        matches!(self, OrderStatusType::PendingPayment | OrderStatusType::Paid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::PendingPayment => write!(f, "PendingPayment"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Preparing => write!(f, "Preparing"),
            OrderStatusType::ReadyForPickup => write!(f, "ReadyForPickup"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "Paid" => Ok(Self::Paid),
            "Preparing" => Ok(Self::Preparing),
            "ReadyForPickup" => Ok(Self::ReadyForPickup),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub total_price: Money,
    pub status: OrderStatusType,
    pub rejection_reason: Option<String>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// The sum of the line item snapshots. This must always equal `total_price`.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_item_id: i64,
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub price_at_time_of_order: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price_at_time_of_order * self.quantity
    }
}

//--------------------------------------      NewOrder      ---------------------------------------------------------
/// A fully priced order, ready to be written to the database. The engine builds these from an [`OrderLine`] list
/// once stock and pickup time have been validated.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub total_price: Money,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub price_at_time_of_order: Money,
}

/// One requested line of an order: which menu item, and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(menu_item_id: MenuItemId, quantity: i64) -> Self {
        Self { menu_item_id, quantity }
    }
}

//--------------------------------------      MenuItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MenuItem {
    pub item_id: MenuItemId,
    pub name: String,
    pub price: Money,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub price: Money,
    pub inventory_quantity: i64,
}

impl NewMenuItem {
    pub fn new<S: Into<String>>(name: S, price: Money, inventory_quantity: i64) -> Self {
        Self { name: name.into(), price, inventory_quantity }
    }
}

//--------------------------------------    Notification    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new<S: Into<String>>(user_id: UserId, message: S) -> Self {
        Self { user_id, message: message.into(), link: None }
    }

    pub fn with_link<S: Into<String>>(mut self, link: S) -> Self {
        self.link = Some(link.into());
        self
    }
}

//--------------------------------------  WalletTransaction  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionKind {
    TopUp,
    Payment,
    Refund,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::TopUp => write!(f, "TopUp"),
            TransactionKind::Payment => write!(f, "Payment"),
            TransactionKind::Refund => write!(f, "Refund"),
        }
    }
}

/// An entry in a user's wallet ledger.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub transaction_id: i64,
    pub user_id: UserId,
    pub order_id: Option<OrderId>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    CanteenStaff,
    CanteenManager,
    SystemAdmin,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::CanteenStaff | Role::CanteenManager | Role::SystemAdmin)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "Student"),
            Role::CanteenStaff => write!(f, "CanteenStaff"),
            Role::CanteenManager => write!(f, "CanteenManager"),
            Role::SystemAdmin => write!(f, "SystemAdmin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "canteenstaff" => Ok(Self::CanteenStaff),
            "canteenmanager" => Ok(Self::CanteenManager),
            "systemadmin" => Ok(Self::SystemAdmin),
            _ => Err(ConversionError(format!("Unknown role: {s}"))),
        }
    }
}
