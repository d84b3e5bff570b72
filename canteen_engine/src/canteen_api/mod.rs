//! # Canteen engine public API
//!
//! The `canteen_api` module exposes the programmatic API for the canteen.
//!
//! * [`order_flow_api`] drives orders through their lifecycle, from placement to pickup, including payment, refunds
//!   and expiry of unpaid orders.
//! * [`notification_api`] reads and manages the per-user notification inbox.
//! * [`wallet_api`] provides balances, statements and top-ups for customer wallets.
//! * [`refund_policy`] decides how much of a paid order is returned when a customer cancels it.
//!
//! # API usage
//!
//! Every API instance is created by supplying the backends that implement the traits it needs.
//!
//! ```rust,ignore
//! use canteen_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase, SqliteWallet};
//! let db = SqliteDatabase::new_with_url("sqlite://data/canteen.db", 25).await?;
//! let wallet = SqliteWallet::new_with_url("sqlite://data/canteen_wallet.db", 10).await?;
//! let api = OrderFlowApi::new(db, wallet, EventProducers::default());
//! let orders = api.processable_orders().await?;
//! ```
pub mod clock;
pub mod errors;
pub mod notification_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod refund_policy;
pub mod wallet_api;
