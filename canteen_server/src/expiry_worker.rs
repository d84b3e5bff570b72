use canteen_engine::{db_types::Order, OrderFlowApi, SqliteDatabase, SqliteWallet};
use chrono::Duration;
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Starts the expiry worker, which cancels orders that have not been paid for within `unpaid_timeout`, every
/// `interval`. The worker runs until `shutdown` is cancelled.
pub fn start_expiry_worker(
    api: OrderFlowApi<SqliteDatabase, SqliteWallet>,
    interval: Duration,
    unpaid_timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let period = interval.to_std().unwrap_or(std::time::Duration::from_secs(60));
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Unpaid order expiry worker started. Checking every {}s", period.as_secs());
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("🕰️ Unpaid order expiry worker shutting down");
                    break;
                },
                _ = timer.tick() => {
                    trace!("🕰️ Running unpaid order expiry job");
                    match api.auto_cancel_unpaid_orders(unpaid_timeout).await {
                        Ok(orders) if orders.is_empty() => trace!("🕰️ No unpaid orders have expired"),
                        Ok(orders) => {
                            info!("🕰️ {} unpaid orders expired", orders.len());
                            debug!("🕰️ Expired orders: {}", order_list(&orders));
                        },
                        Err(e) => {
                            error!("🕰️ Error running unpaid order expiry job: {e}");
                        },
                    }
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] user: {} total: {}", o.order_id, o.user_id, o.total_price))
        .collect::<Vec<String>>()
        .join(", ")
}
