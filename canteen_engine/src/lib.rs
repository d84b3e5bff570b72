//! Canteen Engine
//!
//! The canteen engine is the core of a campus canteen ordering service. Students place orders against a menu with
//! limited stock, pay for them from a prepaid wallet, and collect them once the kitchen has prepared them. Canteen
//! staff move orders through the kitchen, or reject them with a full refund.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The wallet collaborator ([`mod@wallet`]), which charges and refunds customers. A SQLite-backed ledger is provided.
//! 3. The canteen engine public API ([`mod@canteen_api`]). This provides the order lifecycle, refund policy,
//!    notification inbox, and wallet self-service.
//!
//! The engine also emits events when orders are placed, paid, progressed, cancelled or modified, and whenever a
//! customer should be notified. Hook into these through [`events::EventHooks`].
mod canteen_api;
mod db;

pub mod db_types;
pub mod events;
pub mod wallet;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use canteen_api::{
    clock,
    errors::{NotificationApiError, OrderFlowError, OrderOperation, StockShortfall, WalletApiError},
    notification_api::NotificationApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    refund_policy,
    wallet_api::WalletApi,
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{CanteenDatabase, CatalogManagement, NotificationManagement, OrderManagement, OrderTransaction};
#[cfg(feature = "sqlite")]
pub use wallet::SqliteWallet;
pub use wallet::{PaymentOutcome, Wallet, WalletError, WalletLedger};
