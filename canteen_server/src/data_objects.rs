use std::fmt::Display;

use canteen_engine::db_types::{Money, Notification, OrderLine, WalletTransaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOrderParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderParams {
    pub items: Vec<OrderLine>,
}

/// Top-up amounts are given in major units as a decimal string, e.g. `"12.50"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpParams {
    pub amount: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceResult {
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHistoryResult {
    pub balance: Money,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCountResult {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsResult {
    pub notifications: Vec<Notification>,
}
