use canteen_engine::{
    db_types::{Money, OrderLine, OrderStatusType},
    order_objects::PlaceOrderRequest,
    OrderFlowError,
};
use chrono::Duration;
use cucumber::{given, then, when};

use crate::cucumber::CanteenWorld;

fn money(amount: &str) -> Money {
    amount.parse().unwrap_or_else(|e| panic!("{amount} is not a valid amount: {e}"))
}

#[given(expr = "the menu has {int} portions of {string} at {word}")]
async fn add_menu_item(world: &mut CanteenWorld, stock: i64, name: String, price: String) {
    let item_id = world.system().await.add_menu_item(&name, &price, stock).await;
    world.menu.insert(name, item_id);
}

#[given(expr = "{word} tops up {word}")]
async fn top_up(world: &mut CanteenWorld, name: String, amount: String) {
    let user = world.user(&name);
    world.system().await.top_up(user, &amount).await;
}

#[when(expr = "{word} orders {int} {string} as order {word}")]
#[given(expr = "{word} orders {int} {string} as order {word}")]
async fn place_order(world: &mut CanteenWorld, name: String, quantity: i64, item: String, label: String) {
    let request = PlaceOrderRequest::new(vec![OrderLine::new(world.item(&item), quantity)]);
    submit_order(world, name, request, label).await;
}

#[given(expr = "{word} orders {int} {string} for pickup in {int} minutes as order {word}")]
async fn schedule_order(
    world: &mut CanteenWorld,
    name: String,
    quantity: i64,
    item: String,
    minutes: i64,
    label: String,
) {
    let pickup = world.system().await.clock.now() + Duration::minutes(minutes);
    let request = PlaceOrderRequest::new(vec![OrderLine::new(world.item(&item), quantity)]).with_pickup_time(pickup);
    submit_order(world, name, request, label).await;
}

async fn submit_order(world: &mut CanteenWorld, name: String, request: PlaceOrderRequest, label: String) {
    let user = world.user(&name);
    match world.system().await.api.place_order(user, request).await {
        Ok(order) => {
            world.orders.insert(label, order.order_id);
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "{word} pays for order {word}")]
#[given(expr = "{word} pays for order {word}")]
async fn pay(world: &mut CanteenWorld, name: String, label: String) {
    let user = world.user(&name);
    let order_id = world.order(&label);
    if let Err(e) = world.system().await.api.confirm_payment(user, order_id).await {
        world.last_error = Some(e);
    }
}

#[when(expr = "{int} minutes and {int} seconds pass")]
async fn time_passes(world: &mut CanteenWorld, minutes: i64, seconds: i64) {
    world.system().await.advance(minutes, seconds);
}

#[when(expr = "{word} cancels order {word}")]
async fn cancel(world: &mut CanteenWorld, name: String, label: String) {
    let user = world.user(&name);
    let order_id = world.order(&label);
    match world.system().await.api.cancel_order(user, order_id).await {
        Ok(result) => world.last_refund = Some(result.refund),
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "the kitchen moves order {word} along")]
async fn progress(world: &mut CanteenWorld, label: String) {
    let order_id = world.order(&label);
    if let Err(e) = world.system().await.api.progress_order(order_id).await {
        world.last_error = Some(e);
    }
}

#[when(expr = "staff reject order {word} because {string}")]
async fn reject(world: &mut CanteenWorld, label: String, reason: String) {
    let order_id = world.order(&label);
    if let Err(e) = world.system().await.api.reject_order(order_id, &reason).await {
        world.last_error = Some(e);
    }
}

#[when(expr = "unpaid orders older than {int} minutes are swept")]
async fn sweep(world: &mut CanteenWorld, minutes: i64) {
    world.system().await.api.auto_cancel_unpaid_orders(Duration::minutes(minutes)).await.expect("Sweep failed");
}

#[then(expr = "the refund is {word}")]
async fn check_refund(world: &mut CanteenWorld, amount: String) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
    assert_eq!(world.last_refund, Some(money(&amount)));
}

#[then(expr = "the cancellation is refused as too late")]
async fn too_late(world: &mut CanteenWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::TooLateToCancel(_))), "Got {:?}", world.last_error);
}

#[then(expr = "the request fails with an invalid status")]
async fn invalid_status(world: &mut CanteenWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::InvalidStatus { .. })), "Got {:?}", world.last_error);
}

#[then(expr = "the request fails with insufficient stock")]
async fn out_of_stock(world: &mut CanteenWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::OutOfStock { .. })), "Got {:?}", world.last_error);
}

#[then(expr = "the payment fails")]
async fn payment_failed(world: &mut CanteenWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::PaymentFailed { .. })), "Got {:?}", world.last_error);
}

#[then(expr = "order {word} is {word}")]
async fn check_status(world: &mut CanteenWorld, label: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Unknown order status");
    let order_id = world.order(&label);
    let order = world.system().await.api.fetch_order(order_id).await.expect("Error fetching order");
    assert_eq!(order.status, expected);
}

#[then(expr = "order {word} was rejected because {string}")]
async fn check_rejection(world: &mut CanteenWorld, label: String, reason: String) {
    let order_id = world.order(&label);
    let order = world.system().await.api.fetch_order(order_id).await.expect("Error fetching order");
    assert_eq!(order.rejection_reason, Some(reason));
}

#[then(expr = "{word} has {word} in their wallet")]
async fn check_balance(world: &mut CanteenWorld, name: String, amount: String) {
    let user = world.user(&name);
    let balance = world.system().await.balance(user).await;
    assert_eq!(balance, money(&amount));
}

#[then(expr = "there are {int} portions of {string} left")]
async fn check_stock(world: &mut CanteenWorld, stock: i64, name: String) {
    let item_id = world.item(&name);
    assert_eq!(world.system().await.stock(item_id).await, stock);
}

#[then(expr = "{word} is told {string}")]
async fn check_notification(world: &mut CanteenWorld, name: String, text: String) {
    let user = world.user(&name);
    let inbox = world.system().await.inbox.clone();
    for _ in 0..40 {
        if inbox.messages_for(user).iter().any(|m| m.contains(&text)) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("{name} was never told \"{text}\". Inbox: {:?}", inbox.messages_for(user));
}
