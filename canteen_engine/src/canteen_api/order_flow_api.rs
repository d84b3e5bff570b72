use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    canteen_api::{
        clock::{system_clock, Clock},
        errors::{OrderFlowError, OrderOperation, StockShortfall},
        order_objects::{CancellationResult, OrderQueryFilter, PlaceOrderRequest, SortOrder},
        refund_policy::quote_refund,
    },
    db::traits::{CanteenDatabase, CatalogManagement, OrderManagement, OrderTransaction},
    db_types::{MenuItem, MenuItemId, Money, NewOrder, NewOrderItem, Order, OrderId, OrderLine, OrderStatusType, UserId},
    events::{
        AnnulmentKind,
        EventProducer,
        EventProducers,
        OrderAnnulledEvent,
        OrderModifiedEvent,
        OrderPaidEvent,
        OrderPlacedEvent,
        OrderStatusChangedEvent,
    },
    wallet::{PaymentOutcome, Wallet},
};

const CUSTOMER_CANCELLATION: &str = "Cancelled by customer";

/// `OrderFlowApi` drives every order through its lifecycle: placement, payment, cancellation, rejection, kitchen
/// progression, edits while unpaid, and expiry of orders that are never paid for.
///
/// Each operation validates what it can up front, then performs all of its writes in a single unit of work that opens
/// with a compare-and-swap on the order's expected status. Competing operations on the same order therefore have
/// exactly one winner. The losers see [`OrderFlowError::InvalidStatus`] and nothing they did is kept.
///
/// Wallet calls happen inside the unit of work, so a failed payment or refund rolls back the order, inventory, and
/// status changes that preceded it.
#[derive(Clone)]
pub struct OrderFlowApi<B, W> {
    db: B,
    wallet: W,
    producers: EventProducers,
    clock: Clock,
    notify_on_expiry: bool,
}

impl<B, W> Debug for OrderFlowApi<B, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, W> OrderFlowApi<B, W> {
    pub fn new(db: B, wallet: W, producers: EventProducers) -> Self {
        Self { db, wallet, producers, clock: system_clock(), notify_on_expiry: true }
    }

    /// Replaces the source of the current time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Whether customers are told when their unpaid orders expire. On by default.
    pub fn with_expiry_notifications(mut self, notify: bool) -> Self {
        self.notify_on_expiry = notify;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl<B, W> OrderFlowApi<B, W>
where
    B: CanteenDatabase + OrderManagement + CatalogManagement,
    W: Wallet,
{
    /// Places a new order for the user, reserving stock for every line.
    ///
    /// Nothing is written unless every item exists and has enough stock. If a pickup time is given, it must lie in the
    /// future. The order starts out as `PendingPayment`, with the current menu prices captured on each line.
    pub async fn place_order(&self, user_id: UserId, request: PlaceOrderRequest) -> Result<Order, OrderFlowError> {
        let lines = consolidate_lines(&request.items)?;
        let now = self.now();
        if let Some(pickup) = request.pickup_time {
            if pickup <= now {
                return Err(OrderFlowError::InvalidInput(format!("Pickup time {pickup} is not in the future")));
            }
        }
        let ids = lines.iter().map(|l| l.menu_item_id).collect::<Vec<_>>();
        let menu = self.db.fetch_menu_items(&ids).await.map_err(OrderFlowError::database)?;
        let items = price_lines(&lines, &menu)?;
        let total_price = items.iter().map(|i| i.price_at_time_of_order * i.quantity).sum::<Money>();
        let new_order = NewOrder { user_id, order_date: now, pickup_time: request.pickup_time, total_price, items };

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        for item in &new_order.items {
            if !tx.reserve_stock(item.menu_item_id, item.quantity).await.map_err(OrderFlowError::database)? {
                abandon(tx).await;
                return Err(self.shortfall(item.menu_item_id, item.quantity).await);
            }
        }
        let order_id = tx.insert_order(&new_order).await.map_err(OrderFlowError::database)?;
        tx.commit().await.map_err(OrderFlowError::database)?;
        info!("🔄️📦️ Order #{order_id} placed by user #{user_id} for {total_price}");

        let order = self.fetch_order(order_id).await?;
        publish(&self.producers.order_placed_producer, OrderPlacedEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Charges the customer's wallet for an unpaid order and marks it as `Paid`.
    ///
    /// If the wallet has insufficient funds, the order is left exactly as it was, including its stock reservation.
    pub async fn confirm_payment(&self, user_id: UserId, order_id: OrderId) -> Result<Order, OrderFlowError> {
        let mut order = self.fetch_owned_order(user_id, order_id).await?;
        let op = OrderOperation::ConfirmPayment;
        require_status(&order, OrderStatusType::PendingPayment, op)?;

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        let swapped = tx
            .transition_status(order_id, OrderStatusType::PendingPayment, OrderStatusType::Paid, None)
            .await
            .map_err(OrderFlowError::database)?;
        if !swapped {
            abandon(tx).await;
            return Err(self.status_conflict(order_id, op).await);
        }
        match self.wallet.process_payment(user_id, order_id, order.total_price).await {
            Ok(PaymentOutcome::Paid) => {},
            Ok(PaymentOutcome::InsufficientFunds { balance }) => {
                abandon(tx).await;
                info!("🔄️💰️ Order #{order_id} needs {}, but the wallet only holds {balance}", order.total_price);
                let reason = format!("Insufficient funds. {} is required, but the balance is {balance}", order.total_price);
                return Err(OrderFlowError::PaymentFailed { order_id, reason });
            },
            Err(e) => {
                abandon(tx).await;
                warn!("🔄️💰️ Wallet could not process payment for order #{order_id}: {e}");
                return Err(OrderFlowError::PaymentFailed { order_id, reason: e.to_string() });
            },
        }
        commit_after_wallet(tx, order_id, "payment").await?;
        order.status = OrderStatusType::Paid;
        info!("🔄️💰️ Order #{order_id} paid by user #{user_id}");

        publish(&self.producers.order_paid_producer, OrderPaidEvent::new(order.clone())).await;
        let message = format!("Payment of {} received for order #{order_id}.", order.total_price);
        self.producers.notify(order.user_id, message, Some(order_link(order_id))).await;
        Ok(order)
    }

    /// Cancels an order on behalf of its owner.
    ///
    /// * Unpaid orders are cancelled free of charge.
    /// * Paid orders are refunded according to the [refund policy](crate::canteen_api::refund_policy). If the policy
    ///   says it is too late, nothing changes.
    /// * Orders that the kitchen has started on can no longer be cancelled.
    ///
    /// Stock is returned to the catalog in every case.
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<CancellationResult, OrderFlowError> {
        let order = self.fetch_owned_order(user_id, order_id).await?;
        let op = OrderOperation::Cancel;
        let (refund, refund_percentage) = match order.status {
            OrderStatusType::PendingPayment => (Money::default(), None),
            OrderStatusType::Paid => {
                let quote = quote_refund(&order, self.now()).ok_or(OrderFlowError::TooLateToCancel(order_id))?;
                (quote.amount, Some(quote.percentage))
            },
            OrderStatusType::Preparing | OrderStatusType::ReadyForPickup | OrderStatusType::Completed => {
                return Err(OrderFlowError::TooLateToCancel(order_id));
            },
            OrderStatusType::Cancelled => {
                return Err(OrderFlowError::InvalidStatus { order_id, status: order.status, operation: op });
            },
        };

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        let swapped = tx
            .transition_status(order_id, order.status, OrderStatusType::Cancelled, Some(CUSTOMER_CANCELLATION))
            .await
            .map_err(OrderFlowError::database)?;
        if !swapped {
            abandon(tx).await;
            return Err(self.status_conflict(order_id, op).await);
        }
        release_reservation(&mut tx, order.status, &order.items).await?;
        if refund.is_positive() {
            if let Err(e) = self.wallet.refund(order_id, refund, CUSTOMER_CANCELLATION).await {
                abandon(tx).await;
                warn!("🔄️❌️ Refund of {refund} for order #{order_id} failed: {e}");
                return Err(OrderFlowError::RefundFailed { order_id, reason: e.to_string() });
            }
            commit_after_wallet(tx, order_id, "refund").await?;
        } else {
            tx.commit().await.map_err(OrderFlowError::database)?;
        }
        info!("🔄️❌️ Order #{order_id} cancelled by user #{user_id}. {refund} refunded");

        let order = self.fetch_order(order_id).await?;
        let message = match refund_percentage {
            Some(pct) => format!(
                "Your order #{order_id} has been cancelled. {pct}% of the total ({refund}) has been refunded to your \
                 wallet."
            ),
            None => format!("Your order #{order_id} has been cancelled."),
        };
        self.producers.notify(order.user_id, message, Some(order_link(order_id))).await;
        let event = OrderAnnulledEvent::new(order.clone(), AnnulmentKind::Cancelled, refund);
        publish(&self.producers.order_annulled_producer, event).await;
        Ok(CancellationResult { order, refund, refund_percentage })
    }

    /// Staff rejection of a paid order. The customer gets a full refund, and the reason is stored with the order.
    pub async fn reject_order(&self, order_id: OrderId, reason: &str) -> Result<Order, OrderFlowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(OrderFlowError::InvalidInput("A reason is required to reject an order".into()));
        }
        let order = self.fetch_order(order_id).await?;
        let op = OrderOperation::Reject;
        require_status(&order, OrderStatusType::Paid, op)?;

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        let swapped = tx
            .transition_status(order_id, OrderStatusType::Paid, OrderStatusType::Cancelled, Some(reason))
            .await
            .map_err(OrderFlowError::database)?;
        if !swapped {
            abandon(tx).await;
            return Err(self.status_conflict(order_id, op).await);
        }
        release_reservation(&mut tx, OrderStatusType::Paid, &order.items).await?;
        let refund = order.total_price;
        if refund.is_positive() {
            if let Err(e) = self.wallet.refund(order_id, refund, reason).await {
                abandon(tx).await;
                warn!("🔄️🚫️ Refund of {refund} for rejected order #{order_id} failed: {e}");
                return Err(OrderFlowError::RefundFailed { order_id, reason: e.to_string() });
            }
            commit_after_wallet(tx, order_id, "refund").await?;
        } else {
            tx.commit().await.map_err(OrderFlowError::database)?;
        }
        info!("🔄️🚫️ Order #{order_id} rejected: {reason}");

        let order = self.fetch_order(order_id).await?;
        let message =
            format!("Your order #{order_id} was rejected: {reason}. {refund} has been refunded to your wallet.");
        self.producers.notify(order.user_id, message, Some(order_link(order_id))).await;
        let event = OrderAnnulledEvent::new(order.clone(), AnnulmentKind::Rejected, refund);
        publish(&self.producers.order_annulled_producer, event).await;
        Ok(order)
    }

    /// Moves the order exactly one step along the kitchen pipeline: `Paid` to `Preparing` to `ReadyForPickup` to
    /// `Completed`.
    pub async fn progress_order(&self, order_id: OrderId) -> Result<Order, OrderFlowError> {
        let mut order = self.fetch_order(order_id).await?;
        let op = OrderOperation::Progress;
        let old_status = order.status;
        let new_status =
            old_status.next().ok_or(OrderFlowError::InvalidStatus { order_id, status: old_status, operation: op })?;

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        let swapped =
            tx.transition_status(order_id, old_status, new_status, None).await.map_err(OrderFlowError::database)?;
        if !swapped {
            abandon(tx).await;
            return Err(self.status_conflict(order_id, op).await);
        }
        tx.commit().await.map_err(OrderFlowError::database)?;
        order.status = new_status;
        info!("🔄️🍳️ Order #{order_id} moved from {old_status} to {new_status}");

        let message = match new_status {
            OrderStatusType::Preparing => format!("Your order #{order_id} is being prepared."),
            OrderStatusType::ReadyForPickup => format!("Your order #{order_id} is ready for pickup!"),
            _ => format!("Your order #{order_id} has been completed. Enjoy your meal!"),
        };
        self.producers.notify(order.user_id, message, Some(order_link(order_id))).await;
        let event = OrderStatusChangedEvent { order_id, user_id: order.user_id, old_status, new_status };
        publish(&self.producers.status_changed_producer, event).await;
        Ok(order)
    }

    /// Replaces the line items of an unpaid order.
    ///
    /// The old reservation is returned to stock, and the new lines are priced and reserved afresh. The order date is
    /// reset to now. If any new line cannot be satisfied, the order and all stock levels are left exactly as they were.
    pub async fn update_pending_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        items: Vec<OrderLine>,
    ) -> Result<Order, OrderFlowError> {
        let lines = consolidate_lines(&items)?;
        let old_order = self.fetch_owned_order(user_id, order_id).await?;
        let op = OrderOperation::Update;
        require_status(&old_order, OrderStatusType::PendingPayment, op)?;

        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        if !tx.claim_order(order_id, OrderStatusType::PendingPayment).await.map_err(OrderFlowError::database)? {
            abandon(tx).await;
            return Err(self.status_conflict(order_id, op).await);
        }
        let current_items = tx.fetch_order_items(order_id).await.map_err(OrderFlowError::database)?;
        release_reservation(&mut tx, OrderStatusType::PendingPayment, &current_items).await?;

        let ids = lines.iter().map(|l| l.menu_item_id).collect::<Vec<_>>();
        let menu = tx.fetch_menu_items(&ids).await.map_err(OrderFlowError::database)?;
        let new_items = match price_lines(&lines, &menu) {
            Ok(items) => items,
            Err(e) => {
                abandon(tx).await;
                debug!("🔄️✏️ Update of order #{order_id} refused: {e}");
                return Err(e);
            },
        };
        for item in &new_items {
            if !tx.reserve_stock(item.menu_item_id, item.quantity).await.map_err(OrderFlowError::database)? {
                let available = menu.get(&item.menu_item_id).map(|m| m.inventory_quantity).unwrap_or_default();
                abandon(tx).await;
                let reason = StockShortfall::Insufficient { requested: item.quantity, available };
                return Err(OrderFlowError::OutOfStock { item: item.menu_item_id, reason });
            }
        }
        let total = new_items.iter().map(|i| i.price_at_time_of_order * i.quantity).sum::<Money>();
        tx.replace_order_items(order_id, &new_items, total, self.now()).await.map_err(OrderFlowError::database)?;
        tx.commit().await.map_err(OrderFlowError::database)?;
        info!("🔄️✏️ Order #{order_id} updated. New total is {total}");

        let new_order = self.fetch_order(order_id).await?;
        let event = OrderModifiedEvent::new(old_order, new_order.clone());
        publish(&self.producers.order_modified_producer, event).await;
        Ok(new_order)
    }

    /// Cancels every order that has been waiting for payment for longer than `timeout`, and returns their stock to the
    /// catalog. No wallet is touched. The whole sweep is a single unit of work, so running it twice in a row cancels
    /// nothing the second time.
    pub async fn auto_cancel_unpaid_orders(&self, timeout: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let cutoff = self.now() - timeout;
        let reason = format!("Not paid within {} minutes", timeout.num_minutes());
        let mut tx = self.db.begin().await.map_err(OrderFlowError::database)?;
        let expired = tx.expire_orders(cutoff, &reason).await.map_err(OrderFlowError::database)?;
        if expired.is_empty() {
            abandon(tx).await;
            trace!("🔄️🕰️ No unpaid orders older than {cutoff}");
            return Ok(Vec::new());
        }
        for order_id in &expired {
            let items = tx.fetch_order_items(*order_id).await.map_err(OrderFlowError::database)?;
            release_reservation(&mut tx, OrderStatusType::PendingPayment, &items).await?;
        }
        tx.commit().await.map_err(OrderFlowError::database)?;
        info!("🔄️🕰️ {} unpaid orders cancelled", expired.len());

        let mut orders = Vec::with_capacity(expired.len());
        for order_id in expired {
            let order = self.fetch_order(order_id).await?;
            if self.notify_on_expiry {
                let message = format!(
                    "Your order #{order_id} was cancelled because it was not paid within {} minutes.",
                    timeout.num_minutes()
                );
                self.producers.notify(order.user_id, message, Some(order_link(order_id))).await;
            }
            let event = OrderAnnulledEvent::new(order.clone(), AnnulmentKind::Expired, Money::default());
            publish(&self.producers.order_annulled_producer, event).await;
            orders.push(order);
        }
        Ok(orders)
    }

    /// All of the user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderFlowError> {
        let query = OrderQueryFilter::default().with_user_id(user_id).sorted(SortOrder::NewestFirst);
        self.db.search_orders(query).await.map_err(OrderFlowError::database)
    }

    /// The orders canteen staff need to work on, oldest first.
    pub async fn processable_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let query =
            OrderQueryFilter::default().with_statuses(&OrderStatusType::PROCESSABLE).sorted(SortOrder::OldestFirst);
        self.db.search_orders(query).await.map_err(OrderFlowError::database)
    }

    /// Every order ever placed, newest first.
    pub async fn order_history(&self) -> Result<Vec<Order>, OrderFlowError> {
        let query = OrderQueryFilter::default().sorted(SortOrder::NewestFirst);
        self.db.search_orders(query).await.map_err(OrderFlowError::database)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️ Searching orders: {query}");
        self.db.search_orders(query).await.map_err(OrderFlowError::database)
    }

    pub async fn fetch_order(&self, order_id: OrderId) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_by_id(order_id)
            .await
            .map_err(OrderFlowError::database)?
            .ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    async fn fetch_owned_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if !order.is_owned_by(user_id) {
            warn!("🔄️ User #{user_id} tried to act on order #{order_id}, which belongs to user #{}", order.user_id);
            return Err(OrderFlowError::Unauthorized { order: order_id, user: user_id });
        }
        Ok(order)
    }

    /// Builds the error for an operation that lost the compare-and-swap on an order's status.
    async fn status_conflict(&self, order_id: OrderId, operation: OrderOperation) -> OrderFlowError {
        match self.db.fetch_order_by_id(order_id).await {
            Ok(Some(order)) => {
                debug!("🔄️ Order #{order_id} changed to {} before it could {operation}", order.status);
                OrderFlowError::InvalidStatus { order_id, status: order.status, operation }
            },
            Ok(None) => OrderFlowError::OrderNotFound(order_id),
            Err(e) => OrderFlowError::database(e),
        }
    }

    /// Builds the error for a reservation that was refused, using the latest stock level.
    async fn shortfall(&self, item: MenuItemId, requested: i64) -> OrderFlowError {
        match self.db.fetch_menu_items(&[item]).await {
            Ok(menu) => {
                let reason = match menu.get(&item) {
                    Some(m) => StockShortfall::Insufficient { requested, available: m.inventory_quantity },
                    None => StockShortfall::NotFound,
                };
                OrderFlowError::OutOfStock { item, reason }
            },
            Err(e) => OrderFlowError::database(e),
        }
    }
}

fn order_link(order_id: OrderId) -> String {
    format!("/orders/{order_id}")
}

fn require_status(order: &Order, expected: OrderStatusType, operation: OrderOperation) -> Result<(), OrderFlowError> {
    if order.status == expected {
        Ok(())
    } else {
        Err(OrderFlowError::InvalidStatus { order_id: order.order_id, status: order.status, operation })
    }
}

/// Validates the requested lines, merging repeated menu items into a single line.
fn consolidate_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, OrderFlowError> {
    if lines.is_empty() {
        return Err(OrderFlowError::InvalidInput("An order must contain at least one item".into()));
    }
    let mut result: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(OrderFlowError::InvalidInput(format!(
                "Quantity for menu item {} must be positive, but was {}",
                line.menu_item_id, line.quantity
            )));
        }
        match result.iter_mut().find(|l| l.menu_item_id == line.menu_item_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    OrderFlowError::InvalidInput(format!("Quantity for menu item {} is too large", line.menu_item_id))
                })?;
            },
            None => result.push(*line),
        }
    }
    Ok(result)
}

/// Checks every line against the catalog and captures the current price. Fails on the first line that cannot be met.
fn price_lines(
    lines: &[OrderLine],
    menu: &HashMap<MenuItemId, MenuItem>,
) -> Result<Vec<NewOrderItem>, OrderFlowError> {
    lines
        .iter()
        .map(|line| {
            let item = menu.get(&line.menu_item_id).ok_or(OrderFlowError::OutOfStock {
                item: line.menu_item_id,
                reason: StockShortfall::NotFound,
            })?;
            if item.inventory_quantity < line.quantity {
                let reason =
                    StockShortfall::Insufficient { requested: line.quantity, available: item.inventory_quantity };
                return Err(OrderFlowError::OutOfStock { item: line.menu_item_id, reason });
            }
            Ok(NewOrderItem {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                price_at_time_of_order: item.price,
            })
        })
        .collect()
}

/// Returns the stock held by an order in `status` to the catalog. Orders that the kitchen has started on hold nothing.
async fn release_reservation<T: OrderTransaction>(
    tx: &mut T,
    status: OrderStatusType,
    items: &[crate::db_types::OrderItem],
) -> Result<(), OrderFlowError> {
    if !status.holds_reservation() {
        return Ok(());
    }
    for item in items {
        tx.release_stock(item.menu_item_id, item.quantity).await.map_err(OrderFlowError::database)?;
    }
    Ok(())
}

async fn abandon<T: OrderTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        warn!("🔄️ Could not roll back unit of work cleanly: {e}");
    }
}

/// Commits a unit of work after the wallet has already moved money. The wallet keeps its own books, so a failure here
/// leaves the two out of step and needs a human to reconcile them.
async fn commit_after_wallet<T: OrderTransaction>(tx: T, order_id: OrderId, action: &str) -> Result<(), OrderFlowError> {
    tx.commit().await.map_err(|e| {
        error!(
            "🔄️ The wallet {action} for order #{order_id} went through, but the order changes could not be saved: {e}. \
             The wallet ledger and the order must be reconciled manually."
        );
        OrderFlowError::SystemError(format!("Could not save order {order_id} after the wallet {action}"))
    })
}

async fn publish<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    for producer in producers {
        producer.publish_event(event.clone()).await;
    }
}
