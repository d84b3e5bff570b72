use canteen_engine::{
    db_types::{Money, OrderId, UserId, WalletTransaction},
    PaymentOutcome,
    Wallet,
    WalletError,
    WalletLedger,
};
use mockall::mock;

mock! {
    pub CanteenWallet {}
    impl Wallet for CanteenWallet {
        async fn process_payment(&self, user_id: UserId, order_id: OrderId, amount: Money) -> Result<PaymentOutcome, WalletError>;
        async fn refund(&self, order_id: OrderId, amount: Money, reason: &str) -> Result<(), WalletError>;
    }
    impl WalletLedger for CanteenWallet {
        async fn top_up(&self, user_id: UserId, amount: Money) -> Result<Money, WalletError>;
        async fn balance(&self, user_id: UserId) -> Result<Money, WalletError>;
        async fn history(&self, user_id: UserId) -> Result<Vec<WalletTransaction>, WalletError>;
    }
}
