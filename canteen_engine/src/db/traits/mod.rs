//! #  Database management and control.
//!
//! This module defines the interface contracts that canteen database *backends* must satisfy.
//!
//! ## Units of work
//! Every state transition of an order touches more than one row: the order itself, its line items, the stock counts of
//! the referenced menu items, and (indirectly) the customer's wallet. [`CanteenDatabase::begin`] hands out an
//! [`OrderTransaction`], an explicit unit of work that lives for exactly one engine operation. Nothing written through
//! it is visible until [`OrderTransaction::commit`] is called, and dropping it (or calling
//! [`OrderTransaction::rollback`]) discards every change.
//!
//! Status changes go through [`OrderTransaction::transition_status`], a compare-and-swap on the expected prior status.
//! When two operations race on the same order, exactly one of them sees its swap succeed.
//!
//! ## Traits
//! * [`CanteenDatabase`] hands out units of work.
//! * [`OrderTransaction`] is the set of mutations available inside a unit of work.
//! * [`OrderManagement`] provides read-only queries over orders.
//! * [`CatalogManagement`] seeds and queries the menu items the engine reserves stock from.
//! * [`NotificationManagement`] stores and reads the notification inbox.
mod canteen_database;
mod catalog_management;
mod notification_management;
mod order_management;

pub use canteen_database::{CanteenDatabase, OrderTransaction};
pub use catalog_management::CatalogManagement;
pub use notification_management::NotificationManagement;
pub use order_management::OrderManagement;
