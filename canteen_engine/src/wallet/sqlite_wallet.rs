use std::{env, fmt::Debug};

use chrono::Utc;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::{PaymentOutcome, Wallet, WalletError, WalletLedger};
use crate::{
    db::sqlite::new_pool,
    db_types::{Money, OrderId, TransactionKind, UserId, WalletTransaction},
};

const WALLET_DB_URL: &str = "sqlite://data/canteen_wallet.db";

pub fn wallet_db_url() -> String {
    let result = env::var("CANTEEN_WALLET_DATABASE_URL").unwrap_or_else(|_| {
        info!("👛️ CANTEEN_WALLET_DATABASE_URL is not set. Using the default.");
        WALLET_DB_URL.to_string()
    });
    info!("👛️ Using wallet database URL: {result}");
    result
}

/// A wallet ledger backed by its own SQLite database.
#[derive(Clone)]
pub struct SqliteWallet {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteWallet ({})", self.url)
    }
}

impl SqliteWallet {
    pub async fn new() -> Result<Self, WalletError> {
        Self::new_with_url(&wallet_db_url(), 10).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, WalletError> {
        let pool = new_pool(url, max_connections).await.map_err(|e| WalletError::Backend(e.to_string()))?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), WalletError> {
        sqlx::migrate!("./src/wallet/migrations").run(&self.pool).await?;
        info!("👛️ Wallet migrations complete for {}", self.url);
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn fetch_balance(user_id: UserId, conn: &mut SqliteConnection) -> Result<Money, WalletError> {
    let balance = sqlx::query_scalar::<_, Money>("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance.unwrap_or_default())
}

async fn record_transaction(
    user_id: UserId,
    order_id: Option<OrderId>,
    kind: TransactionKind,
    amount: Money,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, WalletError> {
    let id = sqlx::query_scalar(
        r#"
            INSERT INTO wallet_transactions (user_id, order_id, kind, amount, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING transaction_id
        "#,
    )
    .bind(user_id)
    .bind(order_id)
    .bind(kind.to_string())
    .bind(amount)
    .bind(description)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(id)
}

fn require_positive(amount: Money) -> Result<(), WalletError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(WalletError::InvalidAmount(amount))
    }
}

impl Wallet for SqliteWallet {
    async fn process_payment(
        &self,
        user_id: UserId,
        order_id: OrderId,
        amount: Money,
    ) -> Result<PaymentOutcome, WalletError> {
        if amount == Money::default() {
            debug!("👛️ Order #{order_id} is free. Nothing to charge");
            return Ok(PaymentOutcome::Paid);
        }
        require_positive(amount)?;
        let mut tx = self.pool.begin().await?;
        let debit = sqlx::query(
            r#"
                UPDATE wallets SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
                WHERE user_id = $2 AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if debit.rows_affected() == 0 {
            tx.rollback().await?;
            let mut conn = self.pool.acquire().await?;
            let balance = fetch_balance(user_id, &mut conn).await?;
            info!("👛️ User #{user_id} cannot pay {amount} for order #{order_id}. Balance is {balance}");
            return Ok(PaymentOutcome::InsufficientFunds { balance });
        }
        let description = format!("Payment for order #{order_id}");
        record_transaction(user_id, Some(order_id), TransactionKind::Payment, amount, &description, &mut tx).await?;
        tx.commit().await?;
        info!("👛️ User #{user_id} paid {amount} for order #{order_id}");
        Ok(PaymentOutcome::Paid)
    }

    async fn refund(&self, order_id: OrderId, amount: Money, reason: &str) -> Result<(), WalletError> {
        require_positive(amount)?;
        let payment = sqlx::query_as::<_, (UserId, Money)>(
            r#"
                SELECT user_id, amount FROM wallet_transactions
                WHERE order_id = $1 AND kind = 'Payment'
                ORDER BY transaction_id DESC LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        let (user_id, paid) = payment.ok_or(WalletError::PaymentNotFound(order_id))?;
        let mut tx = self.pool.begin().await?;
        let description = format!("Refund for order #{order_id}: {reason}");
        record_transaction(user_id, Some(order_id), TransactionKind::Refund, amount, &description, &mut tx).await?;
        let refunded: Money = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM wallet_transactions WHERE order_id = $1 AND kind = 'Refund'",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        if refunded > paid {
            tx.rollback().await?;
            let refundable = paid - (refunded - amount);
            warn!("👛️ Refund of {amount} for order #{order_id} refused. Only {refundable} is refundable");
            return Err(WalletError::RefundExceedsPayment { order_id, requested: amount, refundable });
        }
        sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("👛️ Refunded {amount} to user #{user_id} for order #{order_id}");
        Ok(())
    }
}

impl WalletLedger for SqliteWallet {
    async fn top_up(&self, user_id: UserId, amount: Money) -> Result<Money, WalletError> {
        require_positive(amount)?;
        let mut tx = self.pool.begin().await?;
        let balance: Money = sqlx::query_scalar(
            r#"
                INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET balance = balance + excluded.balance, updated_at = CURRENT_TIMESTAMP
                RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;
        record_transaction(user_id, None, TransactionKind::TopUp, amount, "Wallet top-up", &mut tx).await?;
        tx.commit().await?;
        info!("👛️ User #{user_id} topped up {amount}. New balance is {balance}");
        Ok(balance)
    }

    async fn balance(&self, user_id: UserId) -> Result<Money, WalletError> {
        let mut conn = self.pool.acquire().await?;
        fetch_balance(user_id, &mut conn).await
    }

    async fn history(&self, user_id: UserId) -> Result<Vec<WalletTransaction>, WalletError> {
        let history = sqlx::query_as::<_, WalletTransaction>(
            r#"
                SELECT transaction_id, user_id, order_id, kind, amount, description, created_at
                FROM wallet_transactions
                WHERE user_id = $1
                ORDER BY transaction_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        trace!("👛️ {} ledger entries for user #{user_id}", history.len());
        Ok(history)
    }
}
