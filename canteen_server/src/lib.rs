//! # Canteen server
//! This crate hosts the HTTP server for the canteen ordering platform. It is responsible for:
//! * Exposing the order lifecycle to students and canteen staff.
//! * Exposing each user's notification inbox and wallet.
//! * Running the expiry worker, which cancels orders that are not paid for in time.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders/...`: Placing, paying for, cancelling and processing orders.
//! * `/api/notifications/...`: The caller's notification inbox.
//! * `/api/wallet/...`: Wallet balances, statements and top-ups.
//!
//! Every `/api` route requires the caller's identity in the `canteen-user-id` and `canteen-user-role` headers.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod middleware;
pub mod routes;
pub mod server;
