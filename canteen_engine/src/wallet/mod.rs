//! # Wallet collaborator
//!
//! The order flow never touches balances itself. It asks a [`Wallet`] to charge the customer when an order is paid for,
//! and to return money when a paid order is cancelled or rejected. The [`WalletLedger`] trait covers the self-service
//! side of a wallet (top-ups, balances and statements), which the order flow does not need.
//!
//! [`SqliteWallet`] is the reference implementation. It keeps its ledger in a database of its own.
#[cfg(feature = "sqlite")]
mod sqlite_wallet;

#[cfg(feature = "sqlite")]
pub use sqlite_wallet::{wallet_db_url, SqliteWallet};
use thiserror::Error;

use crate::db_types::{Money, OrderId, UserId, WalletTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The customer has been charged.
    Paid,
    /// Nothing was charged. `balance` is what the customer currently has available.
    InsufficientFunds { balance: Money },
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Wallet backend error: {0}")]
    Backend(String),
    #[error("Amount must be positive, but was {0}")]
    InvalidAmount(Money),
    #[error("No payment has been recorded for order {0}")]
    PaymentNotFound(OrderId),
    #[error("Cannot refund {requested} for order {order_id}. At most {refundable} can still be refunded")]
    RefundExceedsPayment { order_id: OrderId, requested: Money, refundable: Money },
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for WalletError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// The payment side of a wallet, as seen by the order flow.
#[allow(async_fn_in_trait)]
pub trait Wallet {
    /// Charges `amount` to the user's wallet for the given order. Running short of funds is a normal outcome, not an
    /// error.
    async fn process_payment(
        &self,
        user_id: UserId,
        order_id: OrderId,
        amount: Money,
    ) -> Result<PaymentOutcome, WalletError>;

    /// Returns `amount` to whoever paid for the order. The wallet locates the payer from its own records.
    async fn refund(&self, order_id: OrderId, amount: Money, reason: &str) -> Result<(), WalletError>;
}

/// Self-service wallet operations.
#[allow(async_fn_in_trait)]
pub trait WalletLedger {
    /// Adds funds to the user's wallet, creating the wallet if necessary. Returns the new balance.
    async fn top_up(&self, user_id: UserId, amount: Money) -> Result<Money, WalletError>;

    /// The user's current balance. Users without a wallet have a balance of zero.
    async fn balance(&self, user_id: UserId) -> Result<Money, WalletError>;

    /// Every ledger entry for the user, newest first.
    async fn history(&self, user_id: UserId) -> Result<Vec<WalletTransaction>, WalletError>;
}
