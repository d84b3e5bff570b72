use std::fmt::Debug;

use log::*;

use crate::{
    canteen_api::errors::WalletApiError,
    db_types::{Money, UserId, WalletTransaction},
    wallet::WalletLedger,
};

/// Self-service access to customer wallets: balances, statements and top-ups.
#[derive(Clone)]
pub struct WalletApi<L> {
    ledger: L,
}

impl<L> Debug for WalletApi<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<L> WalletApi<L>
where L: WalletLedger
{
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub async fn balance(&self, user_id: UserId) -> Result<Money, WalletApiError> {
        Ok(self.ledger.balance(user_id).await?)
    }

    pub async fn history(&self, user_id: UserId) -> Result<Vec<WalletTransaction>, WalletApiError> {
        Ok(self.ledger.history(user_id).await?)
    }

    /// Adds funds to the user's wallet and returns the new balance.
    pub async fn top_up(&self, user_id: UserId, amount: Money) -> Result<Money, WalletApiError> {
        if !amount.is_positive() {
            return Err(WalletApiError::InvalidInput(format!("Top-up amount must be positive, but was {amount}")));
        }
        let balance = self.ledger.top_up(user_id, amount).await?;
        info!("👛️ Wallet for user #{user_id} topped up by {amount}");
        Ok(balance)
    }
}
