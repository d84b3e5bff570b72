use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    db_types::UserId,
    events::{
        EventHandler,
        EventProducer,
        Handler,
        NotificationEvent,
        OrderAnnulledEvent,
        OrderModifiedEvent,
        OrderPaidEvent,
        OrderPlacedEvent,
        OrderStatusChangedEvent,
    },
};

/// Generates the three hook containers for the listed events:
/// * `EventHooks`, the user-supplied callbacks,
/// * `EventHandlers`, one channel per registered hook,
/// * `EventProducers`, the publishing ends handed to the order flow.
macro_rules! event_hooks {
    ($($hook:ident => $producers:ident: $event:ty),+ $(,)?) => {
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producers: Vec<EventProducer<$event>>,)+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self {
                    $($hook: hooks.$hook.map(|f| EventHandler::new(stringify!($hook), buffer_size, f)),)+
                }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producers.push(handler.subscribe());
                    }
                )+
                result
            }

            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(async move {
                            handler.start_handler().await;
                        });
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }
    };
}

event_hooks! {
    on_order_placed => order_placed_producer: OrderPlacedEvent,
    on_order_paid => order_paid_producer: OrderPaidEvent,
    on_order_status_changed => status_changed_producer: OrderStatusChangedEvent,
    on_order_annulled => order_annulled_producer: OrderAnnulledEvent,
    on_order_modified => order_modified_producer: OrderModifiedEvent,
    on_notification => notification_producer: NotificationEvent,
}

impl EventProducers {
    /// Sends a message to the user's notification inbox. Delivery is best-effort and never fails the caller.
    pub async fn notify<S: Into<String>>(&self, user_id: UserId, message: S, link: Option<String>) {
        let event = NotificationEvent::new(user_id, message, link);
        if self.notification_producer.is_empty() {
            trace!("📬️ No notification hook registered. Dropping message for user #{user_id}: {}", event.message);
            return;
        }
        for producer in &self.notification_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}
